use std::collections::HashMap;

use crate::math::Point3;

/// Uniform spatial hash over point indices.
///
/// Each point is bucketed by the integer cell containing it. Lookups scan the
/// cells within reach of the query radius, so a query with a radius no larger
/// than the cell size touches the 27 surrounding cells only.
#[derive(Debug, Clone)]
pub struct PointGrid {
    inv_cell: f64,
    cells: HashMap<(i64, i64, i64), Vec<usize>>,
}

impl PointGrid {
    /// Creates an empty grid with cubic cells of side `cell`.
    #[must_use]
    pub fn new(cell: f64) -> Self {
        let cell = if cell.is_finite() && cell > 0.0 { cell } else { 1e-5 };
        Self {
            inv_cell: 1.0 / cell,
            cells: HashMap::new(),
        }
    }

    /// Builds a grid over every point of `points`, keyed by position in the slice.
    #[must_use]
    pub fn from_points(points: &[Point3], cell: f64) -> Self {
        let mut grid = Self::new(cell);
        for (index, point) in points.iter().enumerate() {
            grid.insert(index, point);
        }
        grid
    }

    /// Records `index` as living at `point`.
    pub fn insert(&mut self, index: usize, point: &Point3) {
        self.cells.entry(self.key(point)).or_default().push(index);
    }

    /// Closest indexed point within `radius` of `point`, lowest index on ties.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn nearest_within(&self, points: &[Point3], point: &Point3, radius: f64) -> Option<usize> {
        let (kx, ky, kz) = self.key(point);
        let reach = ((radius * self.inv_cell).ceil() as i64).max(1);

        let mut best: Option<(f64, usize)> = None;
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                for dz in -reach..=reach {
                    let Some(bucket) = self.cells.get(&(kx + dx, ky + dy, kz + dz)) else {
                        continue;
                    };
                    for &index in bucket {
                        let dist = (points[index] - point).norm();
                        if dist > radius {
                            continue;
                        }
                        let closer = best.is_none_or(|(d, i)| dist < d || (dist == d && index < i));
                        if closer {
                            best = Some((dist, index));
                        }
                    }
                }
            }
        }
        best.map(|(_, index)| index)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn key(&self, point: &Point3) -> (i64, i64, i64) {
        (
            (point.x * self.inv_cell).floor() as i64,
            (point.y * self.inv_cell).floor() as i64,
            (point.z * self.inv_cell).floor() as i64,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn finds_point_across_cell_border() {
        let points = vec![p(0.999_999, 0.0, 0.0), p(5.0, 5.0, 5.0)];
        let grid = PointGrid::from_points(&points, 0.5);
        assert_eq!(grid.nearest_within(&points, &p(1.000_001, 0.0, 0.0), 1e-5), Some(0));
    }

    #[test]
    fn ignores_points_out_of_radius() {
        let points = vec![p(0.0, 0.0, 0.0)];
        let grid = PointGrid::from_points(&points, 1.0);
        assert_eq!(grid.nearest_within(&points, &p(0.5, 0.0, 0.0), 0.1), None);
    }

    #[test]
    fn prefers_closest_candidate() {
        let points = vec![p(0.0, 0.0, 0.0), p(0.3, 0.0, 0.0)];
        let grid = PointGrid::from_points(&points, 1.0);
        assert_eq!(grid.nearest_within(&points, &p(0.25, 0.0, 0.0), 0.5), Some(1));
    }

    #[test]
    fn radius_larger_than_cell() {
        let points = vec![p(0.0, 0.0, 0.0)];
        let grid = PointGrid::from_points(&points, 0.1);
        assert_eq!(grid.nearest_within(&points, &p(0.35, 0.0, 0.0), 0.4), Some(0));
    }
}
