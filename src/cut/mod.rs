//! Cutting a mesh along offset planes anchored on polylines of its edges.
//!
//! Every polyline edge gets a cutting plane, moved into the solid by the
//! [`Cutter`]. Neighbouring planes are bounded by [`Separator`]s, so each edge
//! only removes material up to the bisector of its vertices. Where several
//! open polylines end on one vertex, a junction, the edges ending there are
//! bounded against each other and against an extra corner plane that removes
//! the tip left between them. The gap each of those edge boundaries leaves at
//! the junction is closed by a segment shared with the corner boundary. The
//! result is a set of closed boundary loops per edge and per corner, ready
//! for a junction surface.

pub mod corner;
pub mod edge;
pub mod params;
pub mod policy;
pub mod separator;
pub mod simplify;
pub(crate) mod split;

pub use params::{CutParams, Resolution};
pub use policy::{Cutter, OffsetFn};
pub use separator::{Separator, Span};

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::math::{Point3, Vector3};
use crate::mesh::{Connectivity, Mesh};

use self::corner::{corner_offset, cut_corner, junction_bounds, Incident};
use self::edge::cut_edge;
use self::policy::{edge_normals, offsets_along};
use self::separator::{is_closed, separators};
use self::simplify::{chain_segments, finalize};

/// Directed pair of point indices on a cut boundary.
pub type Segment = (usize, usize);

/// Boundary left by cutting one polyline edge.
#[derive(Debug, Clone, Default)]
pub struct EdgeBoundary {
    /// Index of the polyline in the cut request.
    pub line: usize,
    /// The polyline edge.
    pub edge: (usize, usize),
    pub segments: Vec<Segment>,
}

/// Boundary left by a corner cut.
#[derive(Debug, Clone, Default)]
pub struct CornerBoundary {
    pub point: usize,
    pub segments: Vec<Segment>,
}

/// All boundaries produced by a cut.
///
/// Segments are oriented as the half-edges the faces filling the cut must
/// own: each is the reverse of an edge of a remaining face, except where an
/// edge boundary is closed at a junction, whose closing segment appears
/// reversed in the corner boundary.
#[derive(Debug, Clone, Default)]
pub struct CutBoundaries {
    pub edges: Vec<EdgeBoundary>,
    pub corners: Vec<CornerBoundary>,
}

impl CutBoundaries {
    /// Segment groups, edges first, then corners.
    pub fn groups(&self) -> impl Iterator<Item = &[Segment]> {
        self.edges
            .iter()
            .map(|e| e.segments.as_slice())
            .chain(self.corners.iter().map(|c| c.segments.as_slice()))
    }

    fn groups_mut(&mut self) -> impl Iterator<Item = &mut Vec<Segment>> {
        self.edges
            .iter_mut()
            .map(|e| &mut e.segments)
            .chain(self.corners.iter_mut().map(|c| &mut c.segments))
    }

    /// Total number of boundary segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.groups().map(<[Segment]>::len).sum()
    }
}

/// Cuts `mesh` along the given polylines without filling the cut.
///
/// Offsets, separators and junction bounds are computed for all polylines
/// before any face is touched. Edge cuts run first, then corner cuts, then
/// the boundary is simplified, the cut-away faces are dropped and the edge
/// boundaries are closed at their junctions.
///
/// # Errors
///
/// Returns an error if a polyline has fewer than two points or refers to a
/// missing point.
pub fn cut(mesh: &mut Mesh, lines: &[Vec<usize>], cutter: &Cutter, tolerance: f64) -> Result<CutBoundaries> {
    for line in lines {
        validate_line(mesh, line)?;
    }

    let mut conn = Connectivity::build(mesh);
    let vertex_normals = mesh.vertex_normals();

    let plans: Vec<_> = lines
        .iter()
        .map(|line| {
            let normals = edge_normals(mesh, &conn, line);
            let offsets = offsets_along(mesh.points(), line, &normals, cutter, tolerance);
            let seps = separators(mesh.points(), line, &offsets, tolerance);
            (normals, offsets, seps)
        })
        .collect();

    let junctions = find_junctions(mesh.points(), lines, &plans, &vertex_normals, tolerance);
    let mut limits: HashMap<usize, Vec<Separator>> = HashMap::new();
    for junction in &junctions {
        for (index, &slot) in junction.slots.iter().enumerate() {
            let bounds = junction_bounds(
                mesh.points(),
                junction.point,
                &junction.incident,
                index,
                junction.offset.as_ref(),
                tolerance,
            );
            limits.entry(slot).or_default().extend(bounds);
        }
    }

    let mut removal = HashSet::new();
    let mut boundaries = CutBoundaries::default();
    for (index, (line, (_, offsets, seps))) in lines.iter().zip(&plans).enumerate() {
        for (i, offset) in offsets.iter().enumerate() {
            let edge = (line[i], line[i + 1]);
            let slot = boundaries.edges.len();
            let segments = match offset {
                Some(offset) => {
                    let bounds = limits.remove(&slot).unwrap_or_default();
                    let span = Span::new(seps[i], seps[i + 1]).bounded_by(bounds);
                    cut_edge(mesh, &mut conn, edge, offset, &span, &mut removal, tolerance)
                }
                None => Vec::new(),
            };
            debug!(line = index, ?edge, segments = segments.len(), "cut edge");
            boundaries.edges.push(EdgeBoundary {
                line: index,
                edge,
                segments,
            });
        }
    }

    for junction in &junctions {
        let segments = match &junction.offset {
            Some(offset) => cut_corner(mesh, &mut conn, junction.point, offset, &mut removal, tolerance),
            None => Vec::new(),
        };
        debug!(point = junction.point, segments = segments.len(), "cut corner");
        boundaries.corners.push(CornerBoundary {
            point: junction.point,
            segments,
        });
    }

    finalize(mesh, boundaries.groups_mut(), &removal, tolerance);
    for (corner, junction) in junctions.iter().enumerate() {
        close_junction(mesh.points(), &mut boundaries, corner, junction);
    }
    Ok(boundaries)
}

/// An open end shared by two or more cut polylines.
#[derive(Debug)]
struct Junction {
    point: usize,
    /// Positions in [`CutBoundaries::edges`] of the incident edges.
    slots: Vec<usize>,
    incident: Vec<Incident>,
    /// Offset of the corner plane, if the point has a usable normal.
    offset: Option<Vector3>,
}

type Plan = (Vec<Option<(Vector3, Vector3)>>, Vec<Option<Vector3>>, Vec<Option<Separator>>);

fn find_junctions(
    points: &[Point3],
    lines: &[Vec<usize>],
    plans: &[Plan],
    vertex_normals: &[Vector3],
    tolerance: f64,
) -> Vec<Junction> {
    let mut ends: BTreeMap<usize, Vec<(usize, Incident)>> = BTreeMap::new();
    let mut slot = 0;
    for (line, (normals, offsets, _)) in lines.iter().zip(plans) {
        let count = line.len() - 1;
        if !is_closed(line) {
            for (i, point, end) in [(0, line[0], line[1]), (count - 1, line[count], line[count - 1])] {
                if let (Some(offset), Some(faces)) = (offsets[i], normals[i]) {
                    ends.entry(point)
                        .or_default()
                        .push((slot + i, Incident { end, offset, faces }));
                }
            }
        }
        slot += count;
    }

    ends.into_iter()
        .filter(|(_, edges)| edges.len() >= 2)
        .map(|(point, edges)| {
            let (slots, incident): (Vec<_>, Vec<_>) = edges.into_iter().unzip();
            let offset = corner_offset(&points[point], &vertex_normals[point], &incident, tolerance);
            debug!(point, edges = incident.len(), ?offset, "found junction");
            Junction {
                point,
                slots,
                incident,
                offset,
            }
        })
        .collect()
}

/// Closes the boundary of every edge stopping at `junction`.
///
/// The edge boundary gets the segment joining its two ends nearest to the
/// junction point; corner `corner` gets the same segment reversed.
fn close_junction(points: &[Point3], boundaries: &mut CutBoundaries, corner: usize, junction: &Junction) {
    let at = points[junction.point];
    for &slot in &junction.slots {
        let Some((v, u)) = junction_gap(points, &boundaries.edges[slot].segments, &at) else {
            continue;
        };
        boundaries.edges[slot].segments.push((v, u));
        boundaries.corners[corner].segments.push((u, v));
    }
}

/// Segment from the end of one open chain of `segments` to the start of the
/// next, on the side of `at`.
fn junction_gap(points: &[Point3], segments: &[Segment], at: &Point3) -> Option<Segment> {
    let chains: Vec<Vec<usize>> = chain_segments(segments, true)
        .into_iter()
        .filter(|c| c.first() != c.last())
        .collect();
    let gaps = match chains.as_slice() {
        [one] => vec![(*one.last()?, *one.first()?)],
        [one, two] => vec![(*one.last()?, *two.first()?), (*two.last()?, *one.first()?)],
        _ => return None,
    };
    let distance = |&(v, u): &Segment| (points[v] - at).norm() + (points[u] - at).norm();
    gaps.into_iter()
        .filter(|(v, u)| v != u)
        .min_by(|a, b| distance(a).total_cmp(&distance(b)))
}

fn validate_line(mesh: &Mesh, line: &[usize]) -> std::result::Result<(), MeshError> {
    if line.len() < 2 {
        return Err(MeshError::InvalidLine(format!(
            "a cut line needs at least two points, got {}",
            line.len()
        )));
    }
    let len = mesh.points().len();
    if let Some(&index) = line.iter().find(|&&i| i >= len) {
        return Err(MeshError::PointOutOfRange { index, len });
    }
    if line.windows(2).any(|w| w[0] == w[1]) {
        return Err(MeshError::InvalidLine("a cut line repeats a point".into()));
    }
    Ok(())
}
