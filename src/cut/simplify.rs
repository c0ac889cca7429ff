//! Cleanup of the boundary left by a cut: collinear points on the new
//! boundary are merged away, then removed and degenerate faces are dropped.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::math::polygon_3d::{distance_to_line, triangle_height, triangle_normal};
use crate::mesh::{FaceId, Mesh};

use super::Segment;

/// Assembles segments into maximal chains of point indices.
///
/// When `oriented`, a segment only extends a chain in its own direction.
/// A closed chain repeats its first point at the end.
#[must_use]
pub fn chain_segments(segments: &[Segment], oriented: bool) -> Vec<Vec<usize>> {
    let mut remaining: Vec<Segment> = segments.to_vec();
    let mut chains = Vec::new();

    while !remaining.is_empty() {
        let (a, b) = remaining.remove(0);
        let mut chain = vec![a, b];

        loop {
            if chain.first() == chain.last() {
                break;
            }
            let last = chain[chain.len() - 1];
            let first = chain[0];
            if let Some(pos) = remaining
                .iter()
                .position(|&(s, e)| s == last || (!oriented && e == last))
            {
                let (s, e) = remaining.remove(pos);
                chain.push(if s == last { e } else { s });
            } else if let Some(pos) = remaining
                .iter()
                .position(|&(s, e)| e == first || (!oriented && s == first))
            {
                let (s, e) = remaining.remove(pos);
                chain.insert(0, if e == first { s } else { e });
            } else {
                break;
            }
        }
        chains.push(chain);
    }
    chains
}

/// Follows `merges` from `index` to the point it finally merged into.
#[must_use]
pub fn resolve(merges: &HashMap<usize, usize>, mut index: usize) -> usize {
    // a merge map built by this module is acyclic; the bound guards foreign input
    for _ in 0..=merges.len() {
        match merges.get(&index) {
            Some(&next) if next != index => index = next,
            _ => break,
        }
    }
    index
}

/// Faces around each point, for the fold-over check of merges.
pub(crate) type Incidence = HashMap<usize, Vec<FaceId>>;

/// Incidence of the faces that survive the cut.
pub(crate) fn incidence(mesh: &Mesh, removal: &HashSet<FaceId>) -> Incidence {
    let mut around: Incidence = HashMap::new();
    for (id, face) in mesh.faces() {
        if removal.contains(&id) {
            continue;
        }
        for &c in &face.corners {
            around.entry(c).or_default().push(id);
        }
    }
    around
}

/// Merges points lying on the straight part of the boundary chains into
/// their predecessor along the chain.
///
/// A point is merged when it is within `tolerance` of the line through the
/// last kept point and the next point, unless moving it would flip a
/// surviving face. Merges are accumulated in `merges`.
pub(crate) fn line_simplification(
    mesh: &Mesh,
    segments: &[Segment],
    around: &mut Incidence,
    merges: &mut HashMap<usize, usize>,
    tolerance: f64,
) {
    for chain in chain_segments(segments, false) {
        let mut chain: Vec<usize> = chain.into_iter().map(|i| resolve(merges, i)).collect();
        chain.dedup();
        if chain.len() < 3 {
            continue;
        }
        let closed = chain.first() == chain.last();

        let mut anchor = chain[0];
        for k in 1..chain.len() - 1 {
            anchor = simplify_step(mesh, anchor, chain[k], chain[k + 1], around, merges, tolerance);
        }
        if closed && chain.len() > 3 {
            let start = chain[0];
            let after = chain[1..]
                .iter()
                .map(|&i| resolve(merges, i))
                .find(|&i| i != start && i != anchor);
            if let Some(after) = after {
                simplify_step(mesh, anchor, start, after, around, merges, tolerance);
            }
        }
    }
}

fn simplify_step(
    mesh: &Mesh,
    anchor: usize,
    b: usize,
    c: usize,
    around: &mut Incidence,
    merges: &mut HashMap<usize, usize>,
    tolerance: f64,
) -> usize {
    let (a, b, c) = (resolve(merges, anchor), resolve(merges, b), resolve(merges, c));
    if a == b {
        return a;
    }
    let points = mesh.points();
    if distance_to_line(&points[b], &points[a], &points[c]) > tolerance {
        return b;
    }
    if !keeps_orientation(mesh, b, a, around, merges) {
        return b;
    }
    merges.insert(b, a);
    let moved = around.remove(&b).unwrap_or_default();
    around.entry(a).or_default().extend(moved);
    a
}

/// `true` if no surviving face around `from` turns over when `from` moves
/// onto `to`. Faces that collapse are ignored.
fn keeps_orientation(
    mesh: &Mesh,
    from: usize,
    to: usize,
    around: &Incidence,
    merges: &HashMap<usize, usize>,
) -> bool {
    let Some(faces) = around.get(&from) else {
        return true;
    };
    faces.iter().all(|&id| {
        let Some(face) = mesh.face(id) else {
            return true;
        };
        let before = face.corners.map(|c| resolve(merges, c));
        let after = before.map(|c| if c == from { to } else { c });
        if after[0] == after[1] || after[1] == after[2] || after[2] == after[0] {
            return true;
        }
        let n0 = triangle_normal(&mesh.corner_points(&before));
        let n1 = triangle_normal(&mesh.corner_points(&after));
        match (n0, n1) {
            (Some(n0), Some(n1)) => n0.dot(&n1) > 0.0,
            _ => true,
        }
    })
}

/// Maps segment ends through `merges`, dropping collapsed and repeated
/// segments.
#[must_use]
pub fn reindex_segments(segments: &[Segment], merges: &HashMap<usize, usize>) -> Vec<Segment> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .map(|&(a, b)| (resolve(merges, a), resolve(merges, b)))
        .filter(|&(a, b)| a != b && seen.insert((a, b)))
        .collect()
}

/// Finishes a cut.
///
/// Simplifies every boundary group, sharing one merge map so that points on
/// group borders merge consistently, rewrites the groups and all faces
/// through the merges, then drops the faces in `removal` and those left
/// with a height under `tolerance`.
///
/// Returns the resolved merge map.
pub fn finalize<'a>(
    mesh: &mut Mesh,
    groups: impl IntoIterator<Item = &'a mut Vec<Segment>>,
    removal: &HashSet<FaceId>,
    tolerance: f64,
) -> HashMap<usize, usize> {
    let mut groups: Vec<&mut Vec<Segment>> = groups.into_iter().collect();
    let mut around = incidence(mesh, removal);
    let mut merges = HashMap::new();
    for group in &groups {
        line_simplification(mesh, group, &mut around, &mut merges, tolerance);
    }

    let resolved: HashMap<usize, usize> = merges.keys().map(|&k| (k, resolve(&merges, k))).collect();
    for group in &mut groups {
        **group = reindex_segments(group, &resolved);
    }

    mesh.reindex_points(&resolved);
    let points = mesh.points().to_vec();
    let removed = mesh.remove_faces(|id, face| {
        removal.contains(&id)
            || face.is_collapsed()
            || triangle_height(&face.corners.map(|c| points[c])) <= tolerance
    });
    debug!(merged = resolved.len(), removed, "finalized cut");
    resolved
}
