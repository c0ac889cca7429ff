use std::collections::HashSet;

use tracing::trace;

use crate::math::intersect_3d::Plane;
use crate::math::polygon_3d::triangle_height;
use crate::math::{Matrix3, Point3, Vector3, NUMPREC};
use crate::mesh::{Connectivity, FaceId, Mesh};

use super::edge::reversed_edges;
use super::separator::{bisecting_separator, perpendicular_separator, plane_meet, Separator};
use super::split::{classify, split_face, Section, Side};
use super::Segment;

/// A cut polyline edge ending on a junction point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Incident {
    /// The edge's other end.
    pub end: usize,
    /// Offset of the edge's cutting plane.
    pub offset: Vector3,
    /// Normals of the faces on each side of the edge.
    pub faces: (Vector3, Vector3),
}

/// Offset of the cut at a point `p` where several cut polylines end.
///
/// The plane is perpendicular to the vertex normal. It is deep enough to
/// reach every incident edge plane, the largest `|o|^2 / |o . n|` over the
/// incident offsets `o`, and to pass the points where the traces of two
/// incident edges meet on a face plane they share.
#[must_use]
pub fn corner_offset(p: &Point3, normal: &Vector3, incident: &[Incident], tolerance: f64) -> Option<Vector3> {
    let n = normal.try_normalize(0.0)?;
    let reach = incident
        .iter()
        .filter_map(|e| {
            let along = e.offset.dot(&n).abs();
            (along > 0.0).then(|| e.offset.norm_squared() / along)
        })
        .fold(0.0_f64, f64::max);
    let crossing = incident
        .iter()
        .enumerate()
        .flat_map(|(i, a)| incident[i + 1..].iter().filter_map(move |b| trace_meet(p, a, b, tolerance)))
        .map(|x| (p - x).dot(&n))
        .fold(0.0_f64, f64::max);
    let depth = reach.max(crossing);
    (depth > 0.0 && depth.is_finite()).then(|| -n * depth)
}

/// Point where the traces of two incident edges meet on a face plane both
/// edges touch.
fn trace_meet(p: &Point3, a: &Incident, b: &Incident, tolerance: f64) -> Option<Point3> {
    if a.offset.cross(&b.offset).norm() <= tolerance {
        return None;
    }
    let shared = [a.faces.0, a.faces.1]
        .into_iter()
        .find(|m| [b.faces.0, b.faces.1].iter().any(|k| m.dot(k) >= 1.0 - NUMPREC.sqrt()))?;
    let system = Matrix3::from_rows(&[a.offset.transpose(), b.offset.transpose(), shared.transpose()]);
    let rhs = Vector3::new(
        (p + a.offset).coords.dot(&a.offset),
        (p + b.offset).coords.dot(&b.offset),
        p.coords.dot(&shared),
    );
    system.lu().solve(&rhs).map(Point3::from)
}

/// Bounds of the cut of `incident[index]` at the junction point `p`, with
/// normals pointing into the edge's span.
///
/// Against every other incident edge, the bound is the plane through `p` and
/// the line where both cutting planes meet, or the plane perpendicular to
/// the two edges when those planes are parallel. The corner plane bounds the
/// edge as well, so the edge cut stops where the corner cut begins.
#[must_use]
pub fn junction_bounds(
    points: &[Point3],
    p: usize,
    incident: &[Incident],
    index: usize,
    corner: Option<&Vector3>,
    tolerance: f64,
) -> Vec<Separator> {
    let at = points[p];
    let edge = &incident[index];
    let mut bounds: Vec<Separator> = incident
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != index)
        .filter_map(|(_, other)| {
            let along = points[edge.end] - points[other.end];
            bisecting_separator(&at, &along, &edge.offset, &other.offset, tolerance)
                .or_else(|| perpendicular_separator(&at, &edge.offset, &along))
        })
        .collect();

    // a corner plane parallel to the edge plane never meets its trace
    if let Some(corner) = corner {
        if let (Some(normal), Some((origin, axis))) = (
            corner.try_normalize(0.0),
            plane_meet(&at, &edge.offset, corner, tolerance),
        ) {
            bounds.push(Separator { origin, normal, axis });
        }
    }
    bounds
}

/// Cuts the mesh around `point` with the plane through `point + offset` of
/// normal `-offset`.
///
/// Faces are visited from the edges leaving `point` for as long as they have
/// a corner strictly on the removed side. Crossed faces are split and their
/// removed pieces added to `removal`; faces already in `removal` are crossed
/// but left whole.
///
/// Returns the new boundary segments.
pub fn cut_corner(
    mesh: &mut Mesh,
    conn: &mut Connectivity,
    point: usize,
    offset: &Vector3,
    removal: &mut HashSet<FaceId>,
    tolerance: f64,
) -> Vec<Segment> {
    let Some(normal) = (-offset).try_normalize(0.0) else {
        return Vec::new();
    };
    let plane = Plane::new(mesh.points()[point] + offset, normal);

    let mut segments = Vec::new();
    let mut seen = HashSet::new();
    let mut front: Vec<_> = conn.outgoing(point).collect();
    front.sort_unstable();

    while let Some(frontedge) = front.pop() {
        let Some(id) = conn.face(frontedge) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let Some(face) = mesh.face(id).copied() else {
            continue;
        };
        let f = face.corners;
        let pts = mesh.corner_points(&f);

        if triangle_height(&pts) <= tolerance {
            front.extend(reversed_edges(&face));
            continue;
        }

        let (sides, dist) = classify(&plane, &pts, tolerance);
        let inside = sides.map(|s| s == Side::Inside);
        if !inside.contains(&true) {
            continue;
        }

        if !removal.contains(&id) {
            if !sides.contains(&Side::Outside) {
                removal.insert(id);
            } else {
                let section = Section::of(&pts, &sides, &dist);
                match section {
                    Section::Tip { .. } | Section::Through { .. } => {
                        if let Some(result) = split_face(mesh, conn, id, &section, &sides, tolerance) {
                            removal.extend(result.removed.iter().copied());
                            seen.extend(result.pieces());
                            segments.push(result.segment);
                        }
                    }
                    Section::Along { .. } | Section::Clear => {}
                }
            }
        }

        let reversed = reversed_edges(&face);
        for (i, edge) in reversed.into_iter().enumerate() {
            if inside[i] || inside[(i + 1) % 3] {
                front.push(edge);
            }
        }
        trace!(?f, "corner cut visited face");
    }
    segments
}
