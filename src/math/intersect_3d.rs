use super::{Matrix3, Point3, Vector3};

/// An oriented plane given by a point and a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3,
    pub normal: Vector3,
}

impl Plane {
    /// Creates a plane. `normal` is expected to be unit length.
    #[must_use]
    pub fn new(origin: Point3, normal: Vector3) -> Self {
        Self { origin, normal }
    }

    /// Signed distance from a point to the plane.
    /// Positive = on the normal side, negative = opposite.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.normal.dot(&(point - self.origin))
    }
}

/// Point where the segment `a`-`b` crosses a plane, given the signed distances
/// of both ends to that plane.
///
/// The ends must lie strictly on opposite sides.
#[must_use]
pub fn segment_crossing(a: &Point3, b: &Point3, da: f64, db: f64) -> Point3 {
    let t = da / (da - db);
    a + (b - a) * t
}

/// Distance from `point` to the segment `a`-`b`.
#[must_use]
pub fn distance_to_segment(point: &Point3, a: &Point3, b: &Point3) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return (point - a).norm();
    }
    let t = ((point - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (point - (a + ab * t)).norm()
}

/// Intersection of the line `origin + t * axis` with a triangle.
///
/// Only points strictly inside the triangle are returned: the point must be
/// farther than `margin` from each of the three edges. Points on an edge or
/// at a corner, and lines parallel to the triangle, give `None`.
#[must_use]
pub fn axis_triangle_intersect(
    origin: &Point3,
    axis: &Vector3,
    triangle: &[Point3; 3],
    margin: f64,
) -> Option<Point3> {
    let [a, b, c] = triangle;
    let system = Matrix3::from_columns(&[b - a, c - a, *axis]);
    let coords = system.lu().solve(&(origin - a))?;
    let (u, v) = (coords.x, coords.y);
    if !(u > 0.0 && v > 0.0 && u + v < 1.0) {
        return None;
    }

    let point = a + (b - a) * u + (c - a) * v;
    let clear = (0..3).all(|i| {
        distance_to_segment(&point, &triangle[i], &triangle[(i + 1) % 3]) > margin
    });
    clear.then_some(point)
}
