//! Surfaces closing the hole left by a cut.

pub mod flat;
pub mod tangent;

pub use flat::fill_boundary;
pub use tangent::{tangent_junction, TangentFill};

use crate::math::{Point3, Vector3};

/// Curve endpoint: a point and the tangent leaving it into the curve.
pub type Endpoint = (Point3, Vector3);

/// Profile curve between two boundary points of a tangent junction.
#[derive(Debug, Clone, Copy, Default)]
pub enum Interpolation {
    /// Straight segment, tangents ignored.
    Linear,
    /// Cubic Hermite spline.
    #[default]
    Spline,
    /// User curve, called with `x` in `[0, 1]`.
    Custom(fn(&Endpoint, &Endpoint, f64) -> Point3),
}

impl Interpolation {
    /// Point at parameter `x` of the curve from `start` to `end`.
    ///
    /// Both tangents point into the curve, so the curve leaves `start` along
    /// `start.1` and arrives at `end` along `-end.1`.
    #[must_use]
    pub fn point(&self, start: &Endpoint, end: &Endpoint, x: f64) -> Point3 {
        match self {
            Self::Linear => crate::math::lerp(&start.0, &end.0, x),
            Self::Spline => hermite(start, end, x),
            Self::Custom(curve) => curve(start, end, x),
        }
    }
}

fn hermite(start: &Endpoint, end: &Endpoint, x: f64) -> Point3 {
    let x2 = x * x;
    let x3 = x2 * x;
    let h00 = 2.0 * x3 - 3.0 * x2 + 1.0;
    let h10 = x3 - 2.0 * x2 + x;
    let h01 = -2.0 * x3 + 3.0 * x2;
    let h11 = x3 - x2;
    let (p0, t0) = start;
    let (p1, t1) = end;
    Point3::from(p0.coords * h00 + t0 * h10 + p1.coords * h01 - t1 * h11)
}

/// Where a tangent junction takes the surface normals its profiles are
/// tangent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TangentSource {
    /// Normals of the two faces that met at the cut edge, before the cut.
    #[default]
    Adjacent,
    /// Normals of the faces remaining along the cut boundary.
    CutFaces,
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn quarter() -> (Endpoint, Endpoint) {
        (
            (Point3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.5, 0.0)),
            (Point3::new(0.0, 1.0, 0.0), Vector3::new(1.5, 0.0, 0.0)),
        )
    }

    #[test]
    fn spline_hits_endpoints() {
        let (a, b) = quarter();
        let i = Interpolation::default();
        assert_relative_eq!(i.point(&a, &b, 0.0), a.0, epsilon = 1e-15);
        assert_relative_eq!(i.point(&a, &b, 1.0), b.0, epsilon = 1e-15);
    }

    #[test]
    fn spline_follows_tangents() {
        let (a, b) = quarter();
        let i = Interpolation::Spline;
        let h = 1e-6;
        let start = (i.point(&a, &b, h) - a.0) / h;
        assert_relative_eq!(start, a.1, epsilon = 1e-5);
        let end = (b.0 - i.point(&a, &b, 1.0 - h)) / h;
        assert_relative_eq!(end, -b.1, epsilon = 1e-5);
    }

    #[test]
    fn linear_ignores_tangents() {
        let (a, b) = quarter();
        let mid = Interpolation::Linear.point(&a, &b, 0.5);
        assert_relative_eq!(mid, Point3::new(0.5, 0.5, 0.0), epsilon = 1e-15);
    }

    #[test]
    fn custom_curve_is_called() {
        let (a, b) = quarter();
        let i = Interpolation::Custom(|s, _, _| s.0);
        assert_eq!(i.point(&a, &b, 0.7), a.0);
    }
}
