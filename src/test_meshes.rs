//! Reference meshes shared by the unit tests.

use crate::math::Point3;
use crate::mesh::Mesh;

/// Box `[0, nx] x [0, 1] x [0, 1]` with a vertex row at every integer x.
///
/// Point `(x, y, z)` has index `x + (nx + 1) * (y + 2 * z)`, so for `nx = 1`
/// the indices are `x + 2y + 4z`. Every unit quad is split along the diagonal
/// from its first corner.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn grid_box(nx: usize) -> Mesh {
    let row = nx + 1;
    let index = |x: usize, y: usize, z: usize| x + row * (y + 2 * z);

    let mut points = Vec::with_capacity(row * 4);
    for z in 0..2 {
        for y in 0..2 {
            for x in 0..row {
                points.push(Point3::new(x as f64, y as f64, z as f64));
            }
        }
    }

    let mut faces = Vec::new();
    let mut quad = |a: usize, b: usize, c: usize, d: usize| {
        faces.push([a, b, c]);
        faces.push([a, c, d]);
    };
    for x in 0..nx {
        // bottom, top, front, back
        quad(index(x, 0, 0), index(x, 1, 0), index(x + 1, 1, 0), index(x + 1, 0, 0));
        quad(index(x, 0, 1), index(x + 1, 0, 1), index(x + 1, 1, 1), index(x, 1, 1));
        quad(index(x, 0, 0), index(x + 1, 0, 0), index(x + 1, 0, 1), index(x, 0, 1));
        quad(index(x, 1, 0), index(x, 1, 1), index(x + 1, 1, 1), index(x + 1, 1, 0));
    }
    // left and right ends
    quad(index(0, 0, 0), index(0, 0, 1), index(0, 1, 1), index(0, 1, 0));
    quad(index(nx, 0, 0), index(nx, 1, 0), index(nx, 1, 1), index(nx, 0, 1));

    match Mesh::from_triangles(points, faces) {
        Ok(mesh) => mesh,
        Err(e) => panic!("grid box is malformed: {e}"),
    }
}

/// Unit cube, point `(x, y, z)` at index `x + 2y + 4z`.
pub(crate) fn unit_cube() -> Mesh {
    grid_box(1)
}

/// Installs a test log subscriber honouring `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
