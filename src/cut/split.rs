//! Section of a triangle by a cutting plane, and the face split it implies.

use crate::math::intersect_3d::{segment_crossing, Plane};
use crate::math::Point3;
use crate::mesh::{Connectivity, FaceId, Mesh};

use super::Segment;

/// Position of a corner relative to a cutting plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// On the normal side: the material being cut away.
    Inside,
    On,
    /// Against the normal: the material that stays.
    Outside,
}

/// Classifies the corners of a triangle, returning their sides and signed
/// distances.
pub(crate) fn classify(plane: &Plane, points: &[Point3; 3], tolerance: f64) -> ([Side; 3], [f64; 3]) {
    let dist = points.map(|p| plane.signed_distance(&p));
    let sides = dist.map(|d| {
        if d > tolerance {
            Side::Inside
        } else if d < -tolerance {
            Side::Outside
        } else {
            Side::On
        }
    });
    (sides, dist)
}

/// How a cutting plane meets a triangle. Corner indices are local (0..3).
#[derive(Debug, Clone, Copy)]
pub(crate) enum Section {
    /// Corner `lone` is alone on its side; the plane crosses its two edges at
    /// `next` (on `lone -> lone+1`) and `prev` (on `lone+2 -> lone`).
    Tip { lone: usize, next: Point3, prev: Point3 },
    /// The plane passes through corner `corner` and crosses the opposite edge.
    Through { corner: usize, point: Point3 },
    /// The plane contains the edge `start -> start+1`.
    Along { start: usize },
    /// No crossing.
    Clear,
}

impl Section {
    pub(crate) fn of(points: &[Point3; 3], sides: &[Side; 3], dist: &[f64; 3]) -> Self {
        let count = |side: Side| sides.iter().filter(|&&s| s == side).count();
        let (inside, on, outside) = (count(Side::Inside), count(Side::On), count(Side::Outside));

        if inside > 0 && outside > 0 {
            if on == 0 {
                let minority = if inside == 1 { Side::Inside } else { Side::Outside };
                let k = position(sides, minority);
                let (k1, k2) = ((k + 1) % 3, (k + 2) % 3);
                return Self::Tip {
                    lone: k,
                    next: segment_crossing(&points[k], &points[k1], dist[k], dist[k1]),
                    prev: segment_crossing(&points[k2], &points[k], dist[k2], dist[k]),
                };
            }
            let k = position(sides, Side::On);
            let (k1, k2) = ((k + 1) % 3, (k + 2) % 3);
            return Self::Through {
                corner: k,
                point: segment_crossing(&points[k1], &points[k2], dist[k1], dist[k2]),
            };
        }
        if on == 2 {
            let start = (0..3)
                .find(|&k| sides[k] == Side::On && sides[(k + 1) % 3] == Side::On)
                .unwrap_or(0);
            return Self::Along { start };
        }
        Self::Clear
    }

    /// End points of the plane's trace across the triangle.
    pub(crate) fn trace(&self, points: &[Point3; 3]) -> Option<[Point3; 2]> {
        match *self {
            Self::Tip { next, prev, .. } => Some([next, prev]),
            Self::Through { corner, point } => Some([points[corner], point]),
            Self::Along { start } => Some([points[start], points[(start + 1) % 3]]),
            Self::Clear => None,
        }
    }
}

fn position(sides: &[Side; 3], side: Side) -> usize {
    sides.iter().position(|&s| s == side).unwrap_or(0)
}

/// Faces produced by splitting a face along a cutting plane.
#[derive(Debug, Clone)]
pub(crate) struct Split {
    /// Pieces on the outside, which stay.
    pub kept: Vec<FaceId>,
    /// Pieces on the inside, to be removed.
    pub removed: Vec<FaceId>,
    /// The new boundary, oriented as the half-edge a filler face must own.
    pub segment: Segment,
}

impl Split {
    pub(crate) fn pieces(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.kept.iter().chain(&self.removed).copied()
    }
}

/// Splits face `id` along a [`Section::Tip`] or [`Section::Through`],
/// updating the connectivity. The face slot keeps one of the pieces and the
/// others are appended with the same track.
///
/// Returns `None`, leaving the face untouched, for other sections or when a
/// crossing point snaps onto a corner of the face.
pub(crate) fn split_face(
    mesh: &mut Mesh,
    conn: &mut Connectivity,
    id: FaceId,
    section: &Section,
    sides: &[Side; 3],
    tolerance: f64,
) -> Option<Split> {
    let face = *mesh.face(id)?;
    let f = face.corners;

    match *section {
        Section::Tip { lone: k, next, prev } => {
            let (k1, k2) = ((k + 1) % 3, (k + 2) % 3);
            let i1 = mesh.use_point_at(next, tolerance);
            let i2 = mesh.use_point_at(prev, tolerance);
            if f.contains(&i1) || f.contains(&i2) || i1 == i2 {
                return None;
            }
            conn.replace_face(mesh, id, [i1, f[k1], f[k2]]);
            let quad = conn.push_face(mesh, [i1, f[k2], i2], face.track);
            let tip = conn.push_face(mesh, [f[k], i1, i2], face.track);
            Some(if sides[k] == Side::Outside {
                Split {
                    kept: vec![tip],
                    removed: vec![id, quad],
                    segment: (i2, i1),
                }
            } else {
                Split {
                    kept: vec![id, quad],
                    removed: vec![tip],
                    segment: (i1, i2),
                }
            })
        }
        Section::Through { corner: k, point } => {
            let (k1, k2) = ((k + 1) % 3, (k + 2) % 3);
            let i = mesh.use_point_at(point, tolerance);
            if f.contains(&i) {
                return None;
            }
            conn.replace_face(mesh, id, [f[k], f[k1], i]);
            let other = conn.push_face(mesh, [f[k], i, f[k2]], face.track);
            Some(if sides[k1] == Side::Outside {
                Split {
                    kept: vec![id],
                    removed: vec![other],
                    segment: (f[k], i),
                }
            } else {
                Split {
                    kept: vec![other],
                    removed: vec![id],
                    segment: (i, f[k]),
                }
            })
        }
        Section::Along { .. } | Section::Clear => None,
    }
}
