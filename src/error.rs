use thiserror::Error;

/// Top-level error type for mesh cutting.
#[derive(Debug, Error)]
pub enum MeshcutError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Junction(#[from] JunctionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to the mesh store and cut polylines.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("point index {index} is out of range ({len} points)")]
    PointOutOfRange { index: usize, len: usize },

    #[error("{faces} faces but {tracks} tracks")]
    TrackCountMismatch { faces: usize, tracks: usize },

    #[error("track {track} has no group ({groups} groups)")]
    UnknownTrack { track: usize, groups: usize },

    #[error("invalid cut line: {0}")]
    InvalidLine(String),
}

/// Errors raised while resolving an offset policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unknown cutter `{0}`")]
    UnknownCutter(String),

    #[error("cutter parameter {name} = {value} is not a finite number")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Errors raised while building junction surfaces.
#[derive(Debug, Error)]
pub enum JunctionError {
    #[error("edge ({a}, {b}) has {curves} boundary curves, expected 2")]
    AmbiguousBoundary { a: usize, b: usize, curves: usize },

    #[error("triangulation failed: {0}")]
    Triangulation(String),
}

/// Errors in cut parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown resolution `{0}`")]
    UnknownResolution(String),

    #[error("resolution gives no subdivision count for length {length} and angle {angle}")]
    NonFiniteResolution { length: f64, angle: f64 },
}

/// Convenience type alias for results using [`MeshcutError`].
pub type Result<T> = std::result::Result<T, MeshcutError>;
