use super::{Point3, Vector3};

/// Unit normal of a triangle following its corner order, or `None` when the
/// triangle has no area.
#[must_use]
pub fn triangle_normal(triangle: &[Point3; 3]) -> Option<Vector3> {
    let [a, b, c] = triangle;
    (b - a).cross(&(c - a)).try_normalize(0.0)
}

/// Smallest height of a triangle.
///
/// This is the distance from each corner to the line through the opposite
/// side, minimised over the three corners. A triangle with two coincident
/// corners has height zero.
#[must_use]
pub fn triangle_height(triangle: &[Point3; 3]) -> f64 {
    let mut height = f64::INFINITY;
    for i in 0..3 {
        let apex = triangle[i];
        let a = triangle[(i + 1) % 3];
        let b = triangle[(i + 2) % 3];
        let base = b - a;
        let len = base.norm();
        if len == 0.0 {
            return 0.0;
        }
        height = height.min((apex - a).cross(&base).norm() / len);
    }
    height
}

/// Newell normal of a closed polygon, `None` for a polygon without area.
///
/// The normal points to the side from which the polygon is seen
/// counter-clockwise.
#[must_use]
pub fn newell_normal(polygon: &[Point3]) -> Option<Vector3> {
    area_vector(polygon).try_normalize(0.0)
}

/// Newell sum of a closed polygon: twice its area along its normal.
#[must_use]
pub fn area_vector(polygon: &[Point3]) -> Vector3 {
    let n = polygon.len();
    let mut normal = Vector3::zeros();
    if n < 3 {
        return normal;
    }
    for i in 0..n {
        let cur = &polygon[i];
        let next = &polygon[(i + 1) % n];
        normal.x += (cur.y - next.y) * (cur.z + next.z);
        normal.y += (cur.z - next.z) * (cur.x + next.x);
        normal.z += (cur.x - next.x) * (cur.y + next.y);
    }
    normal
}

/// Distance from `point` to the infinite line through `a` and `b`.
///
/// Falls back to the distance to `a` when `a` and `b` coincide.
#[must_use]
pub fn distance_to_line(point: &Point3, a: &Point3, b: &Point3) -> f64 {
    let dir = b - a;
    let rel = point - a;
    match dir.try_normalize(0.0) {
        Some(dir) => (rel - dir * rel.dot(&dir)).norm(),
        None => rel.norm(),
    }
}
