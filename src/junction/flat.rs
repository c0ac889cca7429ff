use std::collections::{HashMap, HashSet};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};
use tracing::{debug, warn};

use crate::cut::simplify::chain_segments;
use crate::cut::Segment;
use crate::error::{JunctionError, Result};
use crate::math::polygon_3d::{area_vector, triangle_height};
use crate::math::{Point3, Vector3};
use crate::mesh::Mesh;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Fills the hole bounded by `segments` with a flat triangulation.
///
/// Closed chains are constrained as they are; open chains are joined end to
/// end into one more loop. All loops are triangulated together in the plane
/// of their summed area, so inner loops leave holes. New faces go to `track`,
/// oriented to own every segment.
///
/// Returns the number of faces added.
///
/// # Errors
///
/// Returns [`JunctionError::Triangulation`] if a point cannot be inserted or
/// the loops cross each other in projection.
pub fn fill_boundary(mesh: &mut Mesh, segments: &[Segment], track: usize, tolerance: f64) -> Result<usize> {
    let loops = boundary_loops(segments);
    let area: Vector3 = loops
        .iter()
        .map(|l| area_vector(&l.iter().map(|&i| mesh.points()[i]).collect::<Vec<_>>()))
        .sum();
    let Some(&start) = loops.first().and_then(|l| l.first()) else {
        return Ok(0);
    };
    let origin = mesh.points()[start];
    let extent = loops
        .iter()
        .flatten()
        .map(|&i| (mesh.points()[i] - origin).norm())
        .fold(0.0_f64, f64::max);
    // a loop narrower than the tolerance has nothing to fill
    if area.norm() / 2.0 <= tolerance * extent {
        return Ok(0);
    }
    let Some(normal) = area.try_normalize(0.0) else {
        return Ok(0);
    };

    let (u, v) = plane_basis(&normal);
    let project = |p: &Point3| {
        let d = p - origin;
        SpadePoint2::new(d.dot(&u), d.dot(&v))
    };

    let mut cdt = Cdt::new();
    let mut indices: HashMap<usize, usize> = HashMap::new();
    for l in &loops {
        let projected: Vec<_> = l.iter().map(|&i| (i, project(&mesh.points()[i]))).collect();
        insert_constraint_loop(&mut cdt, &projected, &mut indices)?;
    }

    let interior = enclosed_faces(&cdt);
    let mut added = 0;
    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        let corners = face.vertices().map(|vh| indices.get(&vh.fix().index()).copied());
        let [Some(a), Some(b), Some(c)] = corners else {
            continue;
        };
        if a == b || b == c || c == a {
            continue;
        }
        if triangle_height(&mesh.corner_points(&[a, b, c])) <= tolerance {
            continue;
        }
        mesh.push_face([a, b, c], track);
        added += 1;
    }
    debug!(loops = loops.len(), added, "filled boundary");
    Ok(added)
}

/// Point loops of a boundary, without the closing repetition.
fn boundary_loops(segments: &[Segment]) -> Vec<Vec<usize>> {
    let mut loops = Vec::new();
    let mut open = Vec::new();
    for mut chain in chain_segments(segments, true) {
        if chain.len() > 2 && chain.first() == chain.last() {
            chain.pop();
            loops.push(chain);
        } else {
            open.push(chain);
        }
    }
    if !open.is_empty() {
        warn!(chains = open.len(), "boundary is not closed, joining its chains");
        let mut joined: Vec<usize> = open.concat();
        joined.dedup();
        if joined.len() > 1 && joined.first() == joined.last() {
            joined.pop();
        }
        if joined.len() >= 3 {
            loops.push(joined);
        }
    }
    loops
}

/// Orthonormal `u`, `v` with `u x v = normal`.
fn plane_basis(normal: &Vector3) -> (Vector3, Vector3) {
    let seed = if normal.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    let u = seed.cross(normal).normalize();
    let v = normal.cross(&u);
    (u, v)
}

/// Inserts the loop points and constrains consecutive points, closing the
/// loop. `indices` maps every CDT vertex to its mesh point.
fn insert_constraint_loop(
    cdt: &mut Cdt,
    points: &[(usize, SpadePoint2<f64>)],
    indices: &mut HashMap<usize, usize>,
) -> Result<()> {
    let mut handles: Vec<FixedVertexHandle> = Vec::with_capacity(points.len());
    for &(index, pt) in points {
        let h = cdt
            .insert(pt)
            .map_err(|e: InsertionError| JunctionError::Triangulation(format!("CDT insert: {e}")))?;
        indices.entry(h.index()).or_insert(index);
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if !cdt.can_add_constraint(from, to) {
            return Err(JunctionError::Triangulation("boundary loop crosses itself".into()).into());
        }
        cdt.add_constraint(from, to);
    }
    Ok(())
}

/// Inner faces enclosed by an odd number of constraint loops.
///
/// Walks the triangulation inward from the hull. Crossing a constraint edge
/// flips between outside and inside; with closed loops the result does not
/// depend on the path taken.
fn enclosed_faces(cdt: &Cdt) -> HashSet<usize> {
    let outer = cdt.outer_face().fix();
    let mut pending: Vec<(FixedFaceHandle<InnerTag>, bool)> = cdt
        .directed_edges()
        .filter(|edge| edge.face().fix() == outer)
        .filter_map(|edge| {
            let face = edge.rev().face().as_inner()?;
            Some((face.fix(), cdt.is_constraint_edge(edge.as_undirected().fix())))
        })
        .collect();

    let mut visited = HashSet::new();
    let mut enclosed = HashSet::new();
    while let Some((face, inside)) = pending.pop() {
        if !visited.insert(face.index()) {
            continue;
        }
        if inside {
            enclosed.insert(face.index());
        }
        for edge in cdt.face(face).adjacent_edges() {
            if let Some(next) = edge.rev().face().as_inner() {
                let crossed = cdt.is_constraint_edge(edge.as_undirected().fix());
                pending.push((next.fix(), inside != crossed));
            }
        }
    }
    enclosed
}
