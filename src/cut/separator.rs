use tracing::debug;

use crate::math::{Matrix3, Point3, Vector3};

/// Plane bounding the cut of one polyline edge against its neighbour.
///
/// It contains `axis`, the line where the two neighbouring cutting planes
/// meet, and the polyline vertex itself. `normal` points toward the next
/// polyline vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separator {
    pub origin: Point3,
    pub normal: Vector3,
    pub axis: Vector3,
}

impl Separator {
    /// Signed distance along the normal, positive past the separator.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.normal.dot(&(point - self.origin))
    }

    /// The same plane facing the other way.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// The part of space an edge cut may act on.
///
/// Each bound is a separator whose normal points into the span. An edge gets
/// the separators of its two polyline vertices, plus the junction bounds of
/// an open end shared with other polylines. An edge with no bound is
/// unbounded.
#[derive(Debug, Clone, Default)]
pub struct Span {
    bounds: Vec<Separator>,
}

impl Span {
    /// Span between the separators of an edge's start and end vertices.
    #[must_use]
    pub fn new(start: Option<Separator>, end: Option<Separator>) -> Self {
        let bounds = end.map(Separator::reversed).into_iter().chain(start).collect();
        Self { bounds }
    }

    /// Adds bounds whose normals already point into the span.
    #[must_use]
    pub fn bounded_by(mut self, bounds: impl IntoIterator<Item = Separator>) -> Self {
        self.bounds.extend(bounds);
        self
    }

    /// `true` if the point is on the inner side of every bound, within
    /// `tolerance`.
    #[must_use]
    pub fn contains(&self, point: &Point3, tolerance: f64) -> bool {
        self.bounds.iter().all(|s| s.signed_distance(point) >= -tolerance)
    }

    /// `true` if the whole segment lies outside one of the bounds. Touching a
    /// bound from outside counts as outside.
    #[must_use]
    pub fn excludes(&self, segment: &[Point3; 2], tolerance: f64) -> bool {
        self.bounds
            .iter()
            .any(|s| segment.iter().all(|p| s.signed_distance(p) < tolerance))
    }

    /// Bounding separators, end first.
    pub fn separators(&self) -> impl Iterator<Item = &Separator> {
        self.bounds.iter()
    }
}

/// `true` if the polyline returns to its first point.
#[must_use]
pub fn is_closed(line: &[usize]) -> bool {
    line.len() > 2 && line.first() == line.last()
}

/// Separator of every polyline vertex.
///
/// `offsets[i]` is the offset of edge `(line[i], line[i + 1])`. The result has
/// one entry per entry of `line`; the two ends of an open line get `None`, and
/// the closing entry of a closed line repeats the first.
///
/// Neighbouring planes are parallel when the cross product of their offsets
/// is no longer than `tolerance`. A vertex whose planes are parallel, or
/// missing, inherits the nearest defined separator before it, else the
/// nearest one after it. When no vertex defines one, every inner vertex gets
/// the plane perpendicular to the polyline through its offset point.
#[must_use]
pub fn separators(
    points: &[Point3],
    line: &[usize],
    offsets: &[Option<Vector3>],
    tolerance: f64,
) -> Vec<Option<Separator>> {
    let len = line.len();
    let mut result = vec![None; len];
    if len < 3 {
        return result;
    }

    let closed = is_closed(line);
    // distinct vertices of a closed line; the last entry repeats the first
    let ring = len - 1;
    let inner: Vec<usize> = if closed { (0..ring).collect() } else { (1..ring).collect() };
    let neighbours = |i: usize| {
        let prev = if i == 0 { ring - 1 } else { i - 1 };
        (prev, i)
    };

    for &i in &inner {
        let (prev_edge, next_edge) = neighbours(i);
        let p = points[line[i]];
        let along = p - points[line[prev_edge]];
        if let (Some(n1), Some(n2)) = (offsets[prev_edge], offsets[next_edge]) {
            result[i] = bisecting_separator(&p, &along, &n1, &n2, tolerance);
        }
    }

    let defined = inner.iter().filter(|&&i| result[i].is_some()).count();
    if defined == 0 {
        for &i in &inner {
            let (prev_edge, next_edge) = neighbours(i);
            let Some(offset) = offsets[next_edge].or(offsets[prev_edge]) else {
                continue;
            };
            let p = points[line[i]];
            let along = points[line[i + 1]] - points[line[prev_edge]];
            result[i] = perpendicular_separator(&p, &offset, &along);
        }
    } else if defined < inner.len() {
        let mut last = None;
        for &i in &inner {
            if result[i].is_some() {
                last = result[i];
            } else {
                result[i] = last;
            }
        }
        let mut next = None;
        for &i in inner.iter().rev() {
            if result[i].is_some() {
                next = result[i];
            } else {
                result[i] = next;
            }
        }
    }

    if closed {
        result[ring] = result[0];
    }
    debug!(vertices = len, bisecting = defined, "computed separators");
    result
}

/// A point where the planes offset by `n1` and `n2` from `p` meet, and the
/// direction of their intersection line. `None` when the planes are
/// parallel.
pub(super) fn plane_meet(p: &Point3, n1: &Vector3, n2: &Vector3, tolerance: f64) -> Option<(Point3, Vector3)> {
    let d = n1.cross(n2);
    if d.norm().is_nan() || d.norm() <= tolerance {
        return None;
    }
    let axis = d.normalize();

    let system = Matrix3::from_rows(&[n1.transpose(), n2.transpose(), axis.transpose()]);
    let rhs = Vector3::new(
        (p + n1).coords.dot(n1),
        (p + n2).coords.dot(n2),
        p.coords.dot(&axis),
    );
    let x = Point3::from(system.lu().solve(&rhs)?);
    Some((x, axis))
}

/// Separator through `p` and the intersection axis of the planes offset by
/// `n1` and `n2` from it, facing `along`. `None` when those planes are
/// parallel.
pub(super) fn bisecting_separator(
    p: &Point3,
    along: &Vector3,
    n1: &Vector3,
    n2: &Vector3,
    tolerance: f64,
) -> Option<Separator> {
    let (x, axis) = plane_meet(p, n1, n2, tolerance)?;
    let mut normal = axis.cross(&(x - p)).try_normalize(0.0)?;
    if normal.dot(along) < 0.0 {
        normal = -normal;
    }
    Some(Separator {
        origin: x,
        normal,
        axis,
    })
}

/// Separator perpendicular to the polyline at `p`, used on straight lines
/// where neighbouring planes never meet.
pub(super) fn perpendicular_separator(p: &Point3, offset: &Vector3, along: &Vector3) -> Option<Separator> {
    let normal = along.try_normalize(0.0)?;
    let axis = offset.cross(&normal).try_normalize(0.0)?;
    Some(Separator {
        origin: p + offset,
        normal,
        axis,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn v(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3::new(x, y, z)
    }

    // ── bisecting separators ──

    #[test]
    fn square_corner_separator_contains_vertex_and_axis() {
        // Top edges of a unit cube meeting at (1, 0, 1), chamfered at distance 0.1.
        let points = vec![p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0)];
        let k = 0.1 / 2.0_f64.sqrt();
        let offsets = vec![Some(v(0.0, k, -k)), Some(v(-k, 0.0, -k))];
        let seps = separators(&points, &[0, 1, 2], &offsets, 1e-12);

        assert!(seps[0].is_none());
        assert!(seps[2].is_none());
        let sep = seps[1].unwrap();
        assert_relative_eq!(sep.signed_distance(&points[1]), 0.0, epsilon = 1e-12);
        assert_relative_eq!(sep.normal.dot(&sep.axis), 0.0, epsilon = 1e-12);
        // the axis lies on both offset planes
        for o in offsets.iter().flatten() {
            let n = o.normalize();
            assert_relative_eq!(n.dot(&(sep.origin - (points[1] + o))), 0.0, epsilon = 1e-12);
            assert_relative_eq!(n.dot(&sep.axis), 0.0, epsilon = 1e-12);
        }
        // oriented toward the next vertex
        assert!(sep.signed_distance(&points[2]) > 0.0);
        assert!(sep.signed_distance(&points[0]) < 0.0);
    }

    // ── inheritance ──

    #[test]
    fn parallel_planes_inherit_previous_separator() {
        let points = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        let offsets = vec![
            Some(v(0.0, 0.0, -0.1)),
            Some(v(0.0, 0.0, -0.2)),
            Some(v(0.1, 0.0, -0.1)),
        ];
        let seps = separators(&points, &[0, 1, 2, 0], &offsets, 1e-12);

        assert!(seps[0].is_some());
        assert!(seps[2].is_some());
        assert_eq!(seps[1], seps[0]);
        assert_eq!(seps[3], seps[0]);
    }

    #[test]
    fn nearly_parallel_planes_follow_the_tolerance() {
        let points = vec![p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(2.0, 0.0, 1.0)];
        // |o1 x o2| = 5e-4
        let offsets = vec![Some(v(0.0, 0.0, -0.1)), Some(v(0.005, 0.0, -0.1))];

        let fine = separators(&points, &[0, 1, 2], &offsets, 1e-12)[1].unwrap();
        assert_relative_eq!(fine.signed_distance(&points[1]), 0.0, epsilon = 1e-12);

        // treated as parallel, so the line falls back to the perpendicular plane
        let coarse = separators(&points, &[0, 1, 2], &offsets, 1e-3)[1].unwrap();
        assert_relative_eq!(coarse.normal, v(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(coarse.origin, points[1] + offsets[1].unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn missing_offset_inherits_next_separator() {
        let points = vec![p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0)];
        let k = 0.1 / 2.0_f64.sqrt();
        let offsets = vec![None, Some(v(-k, 0.0, -k)), Some(v(0.0, -k, -k))];
        let seps = separators(&points, &[0, 1, 2, 3], &offsets, 1e-12);

        assert!(seps[2].is_some());
        assert_eq!(seps[1], seps[2]);
    }

    // ── straight lines ──

    #[test]
    fn straight_line_gets_perpendicular_separator() {
        let points = vec![p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(2.0, 0.0, 1.0)];
        let o = v(0.0, 0.05, -0.05);
        let seps = separators(&points, &[0, 1, 2], &[Some(o), Some(o)], 1e-12);

        assert!(seps[0].is_none() && seps[2].is_none());
        let sep = seps[1].unwrap();
        assert_relative_eq!(sep.normal, v(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(sep.origin, points[1] + o, epsilon = 1e-12);
        assert_relative_eq!(sep.axis.dot(&o), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn two_point_line_has_no_separator() {
        let points = vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)];
        let seps = separators(&points, &[0, 1], &[Some(v(0.0, 0.0, -0.1))], 1e-12);
        assert_eq!(seps, vec![None, None]);
    }

    // ── span ──

    #[test]
    fn span_contains_and_excludes() {
        let start = Separator {
            origin: p(0.0, 0.0, 0.0),
            normal: v(1.0, 0.0, 0.0),
            axis: v(0.0, 0.0, 1.0),
        };
        let end = Separator {
            origin: p(1.0, 0.0, 0.0),
            ..start
        };
        let span = Span::new(Some(start), Some(end));
        assert!(span.contains(&p(0.5, 3.0, 0.0), 1e-9));
        assert!(span.contains(&p(1.0, 0.0, 0.0), 1e-9));
        assert!(!span.contains(&p(1.5, 0.0, 0.0), 1e-9));
        assert!(span.excludes(&[p(-1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)], 1e-9));
        assert!(span.excludes(&[p(1.0, 0.0, 0.0), p(2.0, 1.0, 0.0)], 1e-9));
        assert!(!span.excludes(&[p(-1.0, 0.0, 0.0), p(0.5, 1.0, 0.0)], 1e-9));

        let narrowed = span.bounded_by([Separator {
            origin: p(0.5, 0.0, 0.0),
            normal: v(-1.0, 0.0, 0.0),
            ..start
        }]);
        assert_eq!(narrowed.separators().count(), 3);
        assert!(narrowed.contains(&p(0.25, 0.0, 0.0), 1e-9));
        assert!(!narrowed.contains(&p(0.75, 0.0, 0.0), 1e-9));
        assert!(narrowed.excludes(&[p(0.5, 0.0, 0.0), p(0.9, 1.0, 0.0)], 1e-9));
    }
}
