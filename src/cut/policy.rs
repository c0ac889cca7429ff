use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::PolicyError;
use crate::math::{Point3, Vector3};
use crate::mesh::{Connectivity, Mesh};

/// User-supplied offset function: `(fn1, fn2) -> offset`.
pub type OffsetFn = dyn Fn(&Vector3, &Vector3) -> Vector3 + Send + Sync;

/// How far, and in which direction, the cutting plane of an edge is moved
/// into the solid, as a function of the normals of the two faces meeting at
/// that edge.
#[derive(Clone)]
pub enum Cutter {
    /// Distance between the two resulting boundary lines.
    Width(f64),
    /// Distance from the edge to the cutting plane, along the normal bisector.
    Distance(f64),
    /// Depth of the cut measured along the faces.
    Depth(f64),
    /// Distance tuned to the opening angle of the edge.
    Angle(f64),
    /// Arbitrary offset function.
    Custom(Arc<OffsetFn>),
}

impl fmt::Debug for Cutter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Width(v) => f.debug_tuple("Width").field(v).finish(),
            Self::Distance(v) => f.debug_tuple("Distance").field(v).finish(),
            Self::Depth(v) => f.debug_tuple("Depth").field(v).finish(),
            Self::Angle(v) => f.debug_tuple("Angle").field(v).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Cutter {
    /// Resolves a cutter from its name and parameter.
    ///
    /// Known names are `width`, `distance`, `depth` and `angle`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::UnknownCutter`] for any other name, and
    /// [`PolicyError::InvalidParameter`] when the parameter is not finite.
    pub fn from_name(name: &str, parameter: f64) -> Result<Self, PolicyError> {
        let (name, build): (&'static str, fn(f64) -> Self) = match name {
            "width" => ("width", Self::Width),
            "distance" => ("distance", Self::Distance),
            "depth" => ("depth", Self::Depth),
            "angle" => ("angle", Self::Angle),
            other => return Err(PolicyError::UnknownCutter(other.to_owned())),
        };
        if !parameter.is_finite() {
            return Err(PolicyError::InvalidParameter {
                name,
                value: parameter,
            });
        }
        Ok(build(parameter))
    }

    /// Wraps a closure as a cutter.
    #[must_use]
    pub fn custom(offset: impl Fn(&Vector3, &Vector3) -> Vector3 + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(offset))
    }

    /// Offset of the cutting plane for an edge between faces of normals `fn1`
    /// and `fn2`.
    ///
    /// Returns a zero vector for a fully folded edge, where the normals cancel.
    #[must_use]
    pub fn offset(&self, fn1: &Vector3, fn2: &Vector3) -> Vector3 {
        if let Self::Custom(offset) = self {
            return offset(fn1, fn2);
        }
        if let Self::Depth(depth) = self {
            return match fn1.cross(fn2).try_normalize(0.0) {
                Some(axis) => -axis.cross(&(fn1 - fn2)) * *depth,
                None => Vector3::zeros(),
            };
        }

        let Some(n) = (fn1 + fn2).try_normalize(0.0) else {
            return Vector3::zeros();
        };
        let s = fn1.dot(&n);
        match self {
            Self::Width(width) => -n * (width / 2.0 * (1.0 / (s * s) - 1.0).max(0.0).sqrt()),
            Self::Distance(distance) => -n * *distance,
            Self::Angle(depth) => -n * (depth / 2.0 * (1.0 / s - s)),
            Self::Depth(_) | Self::Custom(_) => Vector3::zeros(),
        }
    }
}

/// Normals `(fn1, fn2)` of the faces on each side of every polyline edge.
///
/// `fn1` belongs to the face owning `(line[i], line[i + 1])`, `fn2` to the
/// face owning the reverse. Edges missing either face give `None`.
#[must_use]
pub fn edge_normals(mesh: &Mesh, conn: &Connectivity, line: &[usize]) -> Vec<Option<(Vector3, Vector3)>> {
    line.windows(2)
        .map(|w| {
            let (a, b) = (w[0], w[1]);
            let fn1 = conn.face((a, b)).and_then(|id| mesh.face_normal(id));
            let fn2 = conn.face((b, a)).and_then(|id| mesh.face_normal(id));
            let pair = fn1.zip(fn2);
            if pair.is_none() {
                warn!(a, b, "cut edge is not between two faces, skipping it");
            }
            pair
        })
        .collect()
}

/// Offset of the cutting plane of every polyline edge.
///
/// The offset is flipped when the edge runs against `cross(fn1, fn2)`, so
/// that the plane always moves into the solid. Edges without two adjacent
/// faces, or whose offset is shorter than `tolerance`, have no plane.
#[must_use]
pub fn plane_offsets(
    mesh: &Mesh,
    conn: &Connectivity,
    line: &[usize],
    cutter: &Cutter,
    tolerance: f64,
) -> Vec<Option<Vector3>> {
    let normals = edge_normals(mesh, conn, line);
    offsets_along(mesh.points(), line, &normals, cutter, tolerance)
}

/// [`plane_offsets`] from face normals already given by [`edge_normals`].
#[must_use]
pub fn offsets_along(
    points: &[Point3],
    line: &[usize],
    normals: &[Option<(Vector3, Vector3)>],
    cutter: &Cutter,
    tolerance: f64,
) -> Vec<Option<Vector3>> {
    normals
        .iter()
        .zip(line.windows(2))
        .map(|(normals, w)| {
            let (fn1, fn2) = (*normals)?;
            let mut offset = cutter.offset(&fn1, &fn2);
            if fn1.cross(&fn2).dot(&(points[w[1]] - points[w[0]])) < 0.0 {
                offset = -offset;
            }
            let usable = offset.iter().all(|c| c.is_finite()) && offset.norm() > tolerance;
            if !usable {
                warn!(a = w[0], b = w[1], "cut edge has a degenerate offset, skipping it");
            }
            usable.then_some(offset)
        })
        .collect()
}
