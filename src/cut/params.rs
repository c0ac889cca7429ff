use std::f64::consts::PI;

use crate::error::ConfigError;
use crate::junction::Interpolation;
use crate::mesh::Mesh;

/// Subdivision policy for junction surfaces.
///
/// Given the length and the turning angle (radians) of a junction profile,
/// decides how many segments the profile gets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Fixed number of segments.
    Div(usize),
    /// Maximum segment length.
    Length(f64),
    /// Maximum angle per segment.
    Angle(f64),
    /// Maximum `angle * length` per segment.
    AngleLength(f64),
    /// Maximum `sqrt(angle) * length` per segment.
    SqrtAngleLength(f64),
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Angle(PI / 16.0)
    }
}

impl Resolution {
    /// Resolves a policy from its name and parameter.
    ///
    /// Accepted names: `div`, `m` / `length`, `rad` / `angle`,
    /// `radm` / `angle_length`, `sqradm` / `sqrt_angle_length`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownResolution`] for any other name.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_name(name: &str, value: f64) -> Result<Self, ConfigError> {
        Ok(match name {
            "div" => Self::Div(value.max(1.0) as usize),
            "m" | "length" => Self::Length(value),
            "rad" | "angle" => Self::Angle(value),
            "radm" | "angle_length" => Self::AngleLength(value),
            "sqradm" | "sqrt_angle_length" => Self::SqrtAngleLength(value),
            other => return Err(ConfigError::UnknownResolution(other.to_owned())),
        })
    }

    /// Number of segments for a profile of the given length and angle,
    /// at least one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonFiniteResolution`] when the policy yields no
    /// finite count, for instance a zero length step.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn subdivisions(&self, length: f64, angle: f64) -> Result<usize, ConfigError> {
        let raw = match *self {
            Self::Div(n) => return Ok(n.max(1)),
            Self::Length(step) => length / step,
            Self::Angle(step) => angle / step,
            Self::AngleLength(step) => angle * length / step,
            Self::SqrtAngleLength(step) => angle.sqrt() * length / step,
        };
        if !raw.is_finite() || raw < 0.0 {
            return Err(ConfigError::NonFiniteResolution { length, angle });
        }
        Ok((raw.ceil() as usize).max(1))
    }
}

/// Parameters shared by the cutting operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CutParams {
    /// Distance under which points are merged and faces are degenerate.
    /// `None` uses [`Mesh::precision`].
    pub tolerance: Option<f64>,
    /// Subdivision of tangent junctions.
    pub resolution: Resolution,
    /// Profile curve of tangent junctions.
    pub interpolation: Interpolation,
}

impl CutParams {
    /// Effective tolerance for a cut of `mesh`.
    #[must_use]
    pub fn tolerance_for(&self, mesh: &Mesh) -> f64 {
        self.tolerance.unwrap_or_else(|| mesh.precision())
    }
}
