pub mod intersect_3d;
pub mod polygon_3d;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3x3 matrix.
pub type Matrix3 = nalgebra::Matrix3<f64>;

/// Relative numeric precision of a stored coordinate.
///
/// Mesh tolerances are derived from it by scaling with the magnitude of the
/// coordinates involved, see [`Mesh::precision`](crate::mesh::Mesh::precision).
pub const NUMPREC: f64 = 1e-13;

/// Linear interpolation between two points.
#[must_use]
pub fn lerp(a: &Point3, b: &Point3, x: f64) -> Point3 {
    a + (b - a) * x
}
