use std::collections::HashSet;

use tracing::trace;

use crate::math::intersect_3d::{axis_triangle_intersect, Plane};
use crate::math::polygon_3d::triangle_height;
use crate::math::Vector3;
use crate::mesh::{Connectivity, Face, FaceId, Mesh};

use super::separator::Span;
use super::split::{classify, split_face, Section, Side};
use super::Segment;

/// Cuts the mesh along the plane of one polyline edge.
///
/// The plane passes through `edge.0 + offset` with normal `-offset`. Starting
/// from the two faces of the edge, faces are visited across their edges for
/// as long as they touch the side being removed within `span`. Each crossed
/// face is split once; the pieces on the removed side, and faces lying
/// entirely on it, are added to `removal`.
///
/// Returns the new boundary segments.
pub fn cut_edge(
    mesh: &mut Mesh,
    conn: &mut Connectivity,
    edge: (usize, usize),
    offset: &Vector3,
    span: &Span,
    removal: &mut HashSet<FaceId>,
    tolerance: f64,
) -> Vec<Segment> {
    let Some(normal) = (-offset).try_normalize(0.0) else {
        return Vec::new();
    };
    let (a, b) = edge;
    let plane = Plane::new(mesh.points()[a] + offset, normal);

    let mut segments = Vec::new();
    let mut seen = HashSet::new();
    let mut front = vec![(b, a), (a, b)];

    while let Some(frontedge) = front.pop() {
        let Some(id) = conn.face(frontedge) else {
            continue;
        };
        if seen.contains(&id) {
            continue;
        }
        let Some(face) = mesh.face(id).copied() else {
            continue;
        };
        let f = face.corners;
        let pts = mesh.corner_points(&f);

        if triangle_height(&pts) <= tolerance {
            seen.insert(id);
            front.extend(reversed_edges(&face));
            continue;
        }
        if split_at_axis(mesh, conn, id, &plane, span, tolerance) {
            front.push(frontedge);
            continue;
        }
        seen.insert(id);

        let (sides, dist) = classify(&plane, &pts, tolerance);
        let goodside = sides.map(|s| s != Side::Outside);
        if !goodside.contains(&true) {
            continue;
        }
        let goodx = pts.map(|p| span.contains(&p, tolerance));

        let section = Section::of(&pts, &sides, &dist);
        let mut split = false;
        if let Some(trace) = section.trace(&pts) {
            if !span.excludes(&trace, tolerance) {
                match section {
                    Section::Tip { .. } | Section::Through { .. } => {
                        if let Some(result) = split_face(mesh, conn, id, &section, &sides, tolerance) {
                            removal.remove(&id);
                            removal.extend(result.removed.iter().copied());
                            seen.extend(result.pieces());
                            segments.push(result.segment);
                            split = true;
                        }
                    }
                    Section::Along { start } => {
                        if sides[(start + 2) % 3] == Side::Outside {
                            segments.push((f[(start + 1) % 3], f[start]));
                        }
                    }
                    Section::Clear => {}
                }
            }
        }

        if !split && goodside.iter().all(|&g| g) && goodx.contains(&true) {
            removal.insert(id);
        }
        if split || (0..3).any(|i| goodside[i] && goodx[i]) {
            front.extend(reversed_edges(&face));
        }
        trace!(?f, split, "edge cut visited face");
    }
    segments
}

/// Edges of the faces across each side of `face`.
pub(crate) fn reversed_edges(face: &Face) -> [(usize, usize); 3] {
    face.edges().map(|(a, b)| (b, a))
}

/// Splits face `id` in three around the point where a separator axis crosses
/// it, when that point lies on the cutting plane strictly inside the face.
///
/// The axis is where two neighbouring cuts meet, so its crossing must become
/// a vertex for both cuts to share their boundary.
fn split_at_axis(
    mesh: &mut Mesh,
    conn: &mut Connectivity,
    id: FaceId,
    plane: &Plane,
    span: &Span,
    tolerance: f64,
) -> bool {
    let Some(face) = mesh.face(id).copied() else {
        return false;
    };
    let f = face.corners;
    let pts = mesh.corner_points(&f);

    for sep in span.separators() {
        let Some(point) = axis_triangle_intersect(&sep.origin, &sep.axis, &pts, tolerance) else {
            continue;
        };
        if plane.signed_distance(&point).abs() > tolerance {
            continue;
        }
        let i = mesh.use_point_at(point, tolerance);
        if f.contains(&i) {
            continue;
        }
        conn.replace_face(mesh, id, [f[0], f[1], i]);
        conn.push_face(mesh, [f[1], f[2], i], face.track);
        conn.push_face(mesh, [f[2], f[0], i], face.track);
        trace!(?f, point = i, "split face at separator axis");
        return true;
    }
    false
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::cut::separator::Separator;
    use crate::math::Point3;
    use crate::test_meshes::unit_cube;

    fn cut_top_front(span: &Span) -> (Mesh, Connectivity, HashSet<FaceId>, Vec<Segment>) {
        let mut mesh = unit_cube();
        let mut conn = Connectivity::build(&mesh);
        let mut removal = HashSet::new();
        let offset = Vector3::new(0.0, 1.0, -1.0).normalize() * 0.1;
        let tol = mesh.precision();
        let segments = cut_edge(&mut mesh, &mut conn, (4, 5), &offset, span, &mut removal, tol);
        (mesh, conn, removal, segments)
    }

    #[test]
    fn open_edge_cut_encircles_edge() {
        let (mesh, conn, removal, segments) = cut_top_front(&Span::default());
        // both faces of the top and front sides, one face of each end
        assert_eq!(segments.len(), 6);
        // every recorded segment is owned by a removed piece and its reverse by a kept one
        for &(a, b) in &segments {
            assert!(removal.contains(&conn.face((a, b)).unwrap()));
            assert!(!removal.contains(&conn.face((b, a)).unwrap()));
        }
        let s = 0.1 * 2.0_f64.sqrt();
        let on_plane = segments
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .all(|i| {
                let q = mesh.points()[i];
                (q.y - q.z + 1.0 - s).abs() < 1e-12
            });
        assert!(on_plane);
        assert!(mesh.is_manifold());
    }

    #[test]
    fn removed_area_matches_chamfer() {
        let (mesh, _, removal, _) = cut_top_front(&Span::default());
        let s = 0.1 * 2.0_f64.sqrt();
        let area: f64 = removal
            .iter()
            .map(|&id| {
                let [x, y, z] = mesh.face_points(id).unwrap();
                (y - x).cross(&(z - x)).norm() / 2.0
            })
            .sum();
        // strips of width s on top and front, triangles of legs s on both ends
        assert_relative_eq!(area, 2.0 * s + s * s, epsilon = 1e-12);
    }

    #[test]
    fn span_limits_the_cut() {
        let stop = Separator {
            origin: Point3::new(0.5, 0.0, 1.0),
            normal: Vector3::x(),
            axis: Vector3::new(0.0, 1.0, 1.0).normalize(),
        };
        let (mesh, _, removal, segments) = cut_top_front(&Span::new(None, Some(stop)));
        assert!(!segments.is_empty());
        for &id in &removal {
            let pts = mesh.face_points(id).unwrap();
            assert!(pts.iter().any(|q| q.x <= 0.5 + 1e-9));
        }
    }

    #[test]
    fn zero_offset_cuts_nothing() {
        let mut mesh = unit_cube();
        let mut conn = Connectivity::build(&mesh);
        let mut removal = HashSet::new();
        let segments = cut_edge(
            &mut mesh,
            &mut conn,
            (4, 5),
            &Vector3::zeros(),
            &Span::default(),
            &mut removal,
            1e-12,
        );
        assert!(segments.is_empty() && removal.is_empty());
        assert_eq!(mesh.face_count(), 12);
    }
}
