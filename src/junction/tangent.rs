//! Rounded junction surface tangent to the faces on each side of the cut.
//!
//! Along every cut edge the boundary is split into the side of each of the
//! two faces that met at the edge. Points of the two sides are paired by arc
//! length, and every pair is joined by a profile curve leaving each side
//! tangentially to its face. Consecutive profiles are stitched into a strip.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::cut::simplify::chain_segments;
use crate::cut::{CutBoundaries, CutParams, EdgeBoundary, Segment};
use crate::error::{JunctionError, Result};
use crate::math::{lerp, Point3, Vector3, NUMPREC};
use crate::mesh::{Connectivity, Mesh};

use super::flat::fill_boundary;
use super::{Endpoint, TangentSource};

/// Face normals `(fn1, fn2)` on each side of a cut edge, keyed by the edge.
pub type EdgeNormals = HashMap<(usize, usize), (Vector3, Vector3)>;

const MATCH_TOLERANCE: f64 = 1e-9;

/// Outcome of [`tangent_junction`].
#[derive(Debug, Default)]
pub struct TangentFill {
    /// Faces added, strips, caps and flat fills together.
    pub faces_added: usize,
    /// Edges left open, with the reason.
    pub unresolved: Vec<JunctionError>,
}

/// Boundary of one cut edge, split between its two faces.
#[derive(Debug)]
struct Sides {
    edge: (usize, usize),
    normals: (Vector3, Vector3),
    /// Point pairs, side of `fn1` first, ordered along the edge.
    matches: Vec<(usize, usize)>,
    /// Strip faces own the side of `fn1` in the direction of the edge.
    forward: bool,
    /// Boundary segments joining the two sides, capped at the end profiles.
    bridges: Vec<Segment>,
}

/// Profile curve between the two points of a match.
struct Profile {
    start: Endpoint,
    end: Endpoint,
    distance: f64,
    angle: f64,
}

/// Builds a tangent junction over every edge boundary of a cut.
///
/// `normals` holds the face normals of each cut edge, taken before the cut.
/// Edges whose boundary cannot be told apart into two sides are reported in
/// [`TangentFill::unresolved`] and left open; a boundary that is a single
/// open chain is filled flat, as are corner boundaries. Strip faces go to
/// `track`; caps closing the ends of a strip go to the track of the face
/// they continue.
///
/// # Errors
///
/// Returns an error if the resolution yields no subdivision count or a flat
/// fill fails to triangulate.
#[allow(clippy::cast_precision_loss, clippy::too_many_lines)]
pub fn tangent_junction(
    mesh: &mut Mesh,
    boundaries: &CutBoundaries,
    normals: &EdgeNormals,
    source: TangentSource,
    track: usize,
    params: &CutParams,
    tolerance: f64,
) -> Result<TangentFill> {
    let conn = Connectivity::build(mesh);
    let mut fill = TangentFill::default();
    let mut plans = Vec::new();

    for boundary in &boundaries.edges {
        if boundary.segments.is_empty() {
            continue;
        }
        let Some(&pair) = normals.get(&boundary.edge) else {
            warn!(edge = ?boundary.edge, "no face normals for cut edge, filling it flat");
            fill.faces_added += fill_boundary(mesh, &boundary.segments, track, tolerance)?;
            continue;
        };
        match split_sides(mesh, boundary, pair) {
            Ok(Some(sides)) => plans.push(sides),
            Ok(None) => {
                fill.faces_added += fill_boundary(mesh, &boundary.segments, track, tolerance)?;
            }
            Err(e) => {
                warn!(error = %e, "leaving cut edge open");
                fill.unresolved.push(e);
            }
        }
    }

    let surface_normals = match source {
        TangentSource::Adjacent => HashMap::new(),
        TangentSource::CutFaces => {
            let mut around = HashMap::new();
            for sides in &plans {
                let first: Vec<usize> = sides.matches.iter().map(|m| m.0).collect();
                let second: Vec<usize> = sides.matches.iter().map(|m| m.1).collect();
                side_normals(mesh, &conn, &first, &mut around);
                side_normals(mesh, &conn, &second, &mut around);
            }
            around
        }
    };

    // tangents are shared by every profile starting on a point
    let mut tangents: HashMap<usize, Vector3> = HashMap::new();
    for sides in &plans {
        let (a, b) = sides.edge;
        let (fn1, fn2) = sides.normals;
        let points = mesh.points();
        let dir = points[b] - points[a];
        for &(p1, p2) in &sides.matches {
            let (q1, q2) = (points[p1], points[p2]);
            let x = ((q1.coords + q2.coords) / 2.0 - points[a].coords).dot(&dir) / dir.norm_squared();
            let o = lerp(&points[a], &points[b], x.clamp(0.0, 1.0));
            let Some(pn) = (q2 - o).cross(&(q1 - o)).try_normalize(NUMPREC) else {
                continue;
            };
            let n1 = surface_normal(&surface_normals, p1).unwrap_or(fn1);
            let n2 = surface_normal(&surface_normals, p2).unwrap_or(fn2);
            if let Some(t) = pn.cross(&n1).try_normalize(NUMPREC) {
                *tangents.entry(p1).or_insert_with(Vector3::zeros) += t;
            }
            if let Some(t) = n2.cross(&pn).try_normalize(NUMPREC) {
                *tangents.entry(p2).or_insert_with(Vector3::zeros) += t;
            }
        }
    }

    let mut div = 1;
    for sides in &plans {
        for &(p1, p2) in &sides.matches {
            let profile = profile_between(mesh.points(), &tangents, p1, p2);
            div = div.max(params.resolution.subdivisions(profile.distance, profile.angle)?);
        }
    }

    let mut strips = 0;
    for sides in &plans {
        let mut columns = Vec::with_capacity(sides.matches.len());
        for &(p1, p2) in &sides.matches {
            let profile = profile_between(mesh.points(), &tangents, p1, p2);
            let mut column = Vec::with_capacity(div + 1);
            column.push(p1);
            for k in 1..div {
                let x = k as f64 / div as f64;
                let point = params.interpolation.point(&profile.start, &profile.end, x);
                column.push(if p1 == p2 { p1 } else { mesh.use_point_at(point, tolerance) });
            }
            column.push(p2);
            columns.push(column);
        }

        for pair in columns.windows(2) {
            let (c0, c1) = (&pair[0], &pair[1]);
            for j in 0..div {
                let faces = if sides.forward {
                    [[c0[j], c1[j], c1[j + 1]], [c0[j], c1[j + 1], c0[j + 1]]]
                } else {
                    [[c0[j], c1[j + 1], c1[j]], [c0[j], c0[j + 1], c1[j + 1]]]
                };
                for corners in faces {
                    let [x, y, z] = corners;
                    if x != y && y != z && z != x {
                        mesh.push_face(corners, track);
                        strips += 1;
                    }
                }
            }
        }

        for &(s, e) in &sides.bridges {
            let Some(column) = columns
                .iter()
                .find(|c| (c[0] == s && c[div] == e) || (c[0] == e && c[div] == s))
            else {
                warn!(edge = ?sides.edge, bridge = ?(s, e), "no profile ends on the strip bridge");
                continue;
            };
            let mut outline = vec![s, e];
            if column[div] == e {
                outline.extend(column[1..div].iter().rev());
            } else {
                outline.extend(&column[1..div]);
            }
            let segments: Vec<Segment> = outline
                .iter()
                .zip(outline.iter().cycle().skip(1))
                .map(|(&u, &v)| (u, v))
                .collect();
            let cap_track = conn
                .face((e, s))
                .and_then(|id| mesh.face(id))
                .map_or(track, |f| f.track);
            fill.faces_added += fill_boundary(mesh, &segments, cap_track, tolerance)?;
        }
    }
    fill.faces_added += strips;

    for corner in &boundaries.corners {
        fill.faces_added += fill_boundary(mesh, &corner.segments, track, tolerance)?;
    }

    debug!(
        edges = plans.len(),
        div,
        strips,
        faces = fill.faces_added,
        unresolved = fill.unresolved.len(),
        "built tangent junction"
    );
    Ok(fill)
}

/// Splits the boundary of one edge into the side of each face.
///
/// Returns `Ok(None)` when the boundary is a single open chain that does not
/// reach both faces.
fn split_sides(
    mesh: &Mesh,
    boundary: &EdgeBoundary,
    normals: (Vector3, Vector3),
) -> std::result::Result<Option<Sides>, JunctionError> {
    let (a, b) = boundary.edge;
    let points = mesh.points();
    let origin = points[a];
    let dir = points[b] - origin;
    let (fn1, fn2) = normals;
    // directions pointing into each face, away from the edge
    let t1 = fn1.cross(&dir);
    let t2 = dir.cross(&fn2);
    let beside_first = |i: usize| {
        let d = points[i] - origin;
        d.dot(&t1) > d.dot(&t2)
    };

    let chains = chain_segments(&boundary.segments, true);
    let (mut first, mut second, bridges) = match chains.as_slice() {
        [one, other] => {
            let count = |c: &[usize]| c.iter().filter(|&&i| beside_first(i)).count();
            if count(one.as_slice()) * other.len() >= count(other.as_slice()) * one.len() {
                (one.clone(), other.clone(), Vec::new())
            } else {
                (other.clone(), one.clone(), Vec::new())
            }
        }
        [chain] => match split_chain(chain, beside_first) {
            Ok(split) => split,
            Err(_) if chain.first() != chain.last() => return Ok(None),
            Err(runs) => return Err(JunctionError::AmbiguousBoundary { a, b, curves: runs }),
        },
        _ => {
            return Err(JunctionError::AmbiguousBoundary {
                a,
                b,
                curves: chains.len(),
            })
        }
    };

    let along = |c: &[usize]| match (c.first(), c.last()) {
        (Some(&s), Some(&e)) => (points[e] - points[s]).dot(&dir),
        _ => 0.0,
    };
    let forward = if first.len() > 1 {
        along(first.as_slice()) >= 0.0
    } else {
        along(second.as_slice()) <= 0.0
    };
    if along(first.as_slice()) < 0.0 {
        first.reverse();
    }
    if along(second.as_slice()) < 0.0 {
        second.reverse();
    }

    Ok(Some(Sides {
        edge: boundary.edge,
        normals,
        matches: curve_match(points, &first, &second),
        forward,
        bridges,
    }))
}

/// Splits one chain into its run beside the first face and its run beside
/// the second, with the segments joining the runs.
///
/// Fails with the number of runs found when there are not exactly two.
fn split_chain(
    chain: &[usize],
    beside_first: impl Fn(usize) -> bool,
) -> std::result::Result<(Vec<usize>, Vec<usize>, Vec<Segment>), usize> {
    let closed = chain.len() > 2 && chain.first() == chain.last();
    let ring = if closed { &chain[..chain.len() - 1] } else { chain };
    let n = ring.len();
    let flags: Vec<bool> = ring.iter().map(|&i| beside_first(i)).collect();
    let start = usize::from(!closed);
    let changes: Vec<usize> = (start..n).filter(|&k| flags[k] != flags[(k + n - 1) % n]).collect();

    let (run_a, run_b, bridges) = if closed {
        let &[c0, c1] = changes.as_slice() else {
            return Err(changes.len().max(1));
        };
        let run_a = ring[c0..c1].to_vec();
        let run_b: Vec<usize> = ring[c1..].iter().chain(&ring[..c0]).copied().collect();
        let bridges = vec![(ring[(c0 + n - 1) % n], ring[c0]), (ring[c1 - 1], ring[c1])];
        (run_a, run_b, bridges)
    } else {
        let &[c] = changes.as_slice() else {
            return Err(changes.len() + 1);
        };
        (ring[..c].to_vec(), ring[c..].to_vec(), vec![(ring[c - 1], ring[c])])
    };

    if beside_first(run_a[0]) {
        Ok((run_a, run_b, bridges))
    } else {
        Ok((run_b, run_a, bridges))
    }
}

/// Pairs the points of two chains by normalized arc length.
///
/// Both chains are walked together; the chain whose next point comes first
/// advances, the other repeats its current point. Ends are always paired.
#[must_use]
pub fn curve_match(points: &[Point3], first: &[usize], second: &[usize]) -> Vec<(usize, usize)> {
    let (Some(&f0), Some(&s0)) = (first.first(), second.first()) else {
        return Vec::new();
    };
    let u = arc_parameters(points, first);
    let v = arc_parameters(points, second);

    let mut matches = vec![(f0, s0)];
    let (mut i, mut j) = (0, 0);
    while i + 1 < first.len() || j + 1 < second.len() {
        let next_u = u.get(i + 1).copied().unwrap_or(f64::INFINITY);
        let next_v = v.get(j + 1).copied().unwrap_or(f64::INFINITY);
        if (next_u - next_v).abs() <= MATCH_TOLERANCE {
            i += 1;
            j += 1;
        } else if next_u < next_v {
            i += 1;
        } else {
            j += 1;
        }
        matches.push((first[i], second[j]));
    }
    matches
}

/// Cumulative arc length along `chain`, scaled to end at 1.
#[allow(clippy::cast_precision_loss)]
fn arc_parameters(points: &[Point3], chain: &[usize]) -> Vec<f64> {
    let mut params = Vec::with_capacity(chain.len());
    let mut total = 0.0;
    params.push(0.0);
    for w in chain.windows(2) {
        total += (points[w[1]] - points[w[0]]).norm();
        params.push(total);
    }
    if total > 0.0 {
        params.iter_mut().for_each(|p| *p /= total);
    } else if chain.len() > 1 {
        let last = (chain.len() - 1) as f64;
        params.iter_mut().enumerate().for_each(|(k, p)| *p = k as f64 / last);
    }
    params
}

/// Accumulates, on every point of `chain`, the normals of the faces left
/// along its segments.
fn side_normals(mesh: &Mesh, conn: &Connectivity, chain: &[usize], around: &mut HashMap<usize, Vector3>) {
    for w in chain.windows(2) {
        let (u, v) = (w[0], w[1]);
        if u == v {
            continue;
        }
        let normal = conn
            .face((v, u))
            .or_else(|| conn.face((u, v)))
            .and_then(|id| mesh.face_normal(id));
        if let Some(n) = normal {
            *around.entry(u).or_insert_with(Vector3::zeros) += n;
            *around.entry(v).or_insert_with(Vector3::zeros) += n;
        }
    }
}

fn surface_normal(normals: &HashMap<usize, Vector3>, point: usize) -> Option<Vector3> {
    normals.get(&point).and_then(|n| n.try_normalize(NUMPREC))
}

/// Profile between `p1` and `p2`, with tangents scaled so that the curve
/// approaches a circular arc turning by the angle between them.
fn profile_between(points: &[Point3], tangents: &HashMap<usize, Vector3>, p1: usize, p2: usize) -> Profile {
    let direction = |p: usize| tangents.get(&p).and_then(|t| t.try_normalize(NUMPREC));
    let (q1, q2) = (points[p1], points[p2]);
    let distance = (q2 - q1).norm();

    let (d1, d2) = (direction(p1), direction(p2));
    let angle = match (d1, d2) {
        (Some(d1), Some(d2)) => (-d1.dot(&d2)).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    };
    let length = if angle > NUMPREC.sqrt() {
        distance / (2.0 - 2.0 * angle.cos()).sqrt() * angle
    } else {
        distance
    };

    Profile {
        start: (q1, d1.unwrap_or_else(Vector3::zeros) * length),
        end: (q2, d2.unwrap_or_else(Vector3::zeros) * length),
        distance,
        angle,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    // ── curve_match ──

    #[test]
    fn equal_chains_pair_one_to_one() {
        let points = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0)];
        assert_eq!(curve_match(&points, &[0, 1], &[2, 3]), vec![(0, 2), (1, 3)]);
    }

    #[test]
    fn sparse_side_repeats_points() {
        let points = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(2.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(2.0, 1.0, 0.0),
        ];
        assert_eq!(
            curve_match(&points, &[0, 1, 2], &[3, 4]),
            vec![(0, 3), (1, 3), (2, 4)]
        );
    }

    #[test]
    fn single_point_side_makes_a_fan() {
        let points = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.5, 1.0, 0.0)];
        assert_eq!(curve_match(&points, &[0, 1], &[2]), vec![(0, 2), (1, 2)]);
    }

    // ── split_chain ──

    #[test]
    fn loop_splits_in_two_runs() {
        // 0 and 1 beside the first face, 2 and 3 beside the second
        let (first, second, bridges) = split_chain(&[2, 3, 0, 1, 2], |i| i < 2).unwrap();
        assert_eq!(first, vec![0, 1]);
        assert_eq!(second, vec![2, 3]);
        assert_eq!(bridges, vec![(1, 2), (3, 0)]);
    }

    #[test]
    fn open_chain_splits_once() {
        let (first, second, bridges) = split_chain(&[4, 5, 6, 7], |i| i >= 6).unwrap();
        assert_eq!(first, vec![6, 7]);
        assert_eq!(second, vec![4, 5]);
        assert_eq!(bridges, vec![(5, 6)]);
    }

    #[test]
    fn interleaved_loop_is_ambiguous() {
        assert_eq!(split_chain(&[0, 1, 2, 3, 0], |i| i % 2 == 0), Err(4));
        assert_eq!(split_chain(&[0, 1, 2], |_| true), Err(1));
    }

    // ── profile ──

    #[test]
    fn quarter_profile_gets_arc_length_tangents() {
        let points = vec![p(0.0, 1.0, 1.0), p(0.0, 0.0, 0.0)];
        let tangents = HashMap::from([(0, Vector3::new(0.0, -1.0, 0.0)), (1, Vector3::new(0.0, 0.0, 1.0))]);
        let profile = profile_between(&points, &tangents, 0, 1);
        assert_relative_eq!(profile.angle, FRAC_PI_2, epsilon = 1e-12);
        // chord sqrt(2) of a unit arc turning a quarter
        assert_relative_eq!(profile.start.1.norm(), FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(profile.end.1.norm(), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn missing_tangents_give_a_straight_profile() {
        let points = vec![p(0.0, 0.0, 0.0), p(3.0, 4.0, 0.0)];
        let profile = profile_between(&points, &HashMap::new(), 0, 1);
        assert_relative_eq!(profile.distance, 5.0);
        assert_relative_eq!(profile.angle, 0.0);
        assert_eq!(profile.start.1, Vector3::zeros());
    }
}
