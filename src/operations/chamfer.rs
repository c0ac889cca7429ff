use tracing::debug;

use crate::cut::{cut, CutParams, Cutter};
use crate::error::Result;
use crate::junction::fill_boundary;
use crate::mesh::Mesh;

use super::JunctionSummary;

/// Cuts a mesh along polylines and closes every cut with flat faces.
#[derive(Debug, Clone)]
pub struct Chamfer {
    lines: Vec<Vec<usize>>,
    cutter: Cutter,
    params: CutParams,
}

impl Chamfer {
    /// Creates a new `Chamfer` along one polyline of point indices.
    #[must_use]
    pub fn new(line: Vec<usize>, cutter: Cutter) -> Self {
        Self::from_lines(vec![line], cutter)
    }

    /// Creates a new `Chamfer` along several polylines cut together.
    #[must_use]
    pub fn from_lines(lines: Vec<Vec<usize>>, cutter: Cutter) -> Self {
        Self {
            lines,
            cutter,
            params: CutParams::default(),
        }
    }

    /// Replaces the default parameters.
    #[must_use]
    pub fn with_params(mut self, params: CutParams) -> Self {
        self.params = params;
        self
    }

    /// Executes the chamfer. Junction faces go to a new `"junction"` group.
    ///
    /// # Errors
    ///
    /// Returns an error if a polyline is invalid or a cut boundary cannot be
    /// triangulated. The mesh may be left cut but not filled.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<JunctionSummary> {
        let tolerance = self.params.tolerance_for(mesh);
        let boundaries = cut(mesh, &self.lines, &self.cutter, tolerance)?;
        let group = mesh.add_group("junction");

        let mut faces_added = 0;
        for segments in boundaries.groups() {
            faces_added += fill_boundary(mesh, segments, group, tolerance)?;
        }
        debug!(
            lines = self.lines.len(),
            segments = boundaries.segment_count(),
            faces_added,
            "chamfer done"
        );

        Ok(JunctionSummary {
            boundaries,
            group,
            faces_added,
            unresolved: Vec::new(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::{MeshError, MeshcutError};
    use crate::test_meshes::{grid_box, init_tracing, unit_cube};

    #[test]
    fn cube_edge() {
        init_tracing();
        let mut mesh = unit_cube();
        let summary = Chamfer::new(vec![4, 5], Cutter::Distance(0.1))
            .execute(&mut mesh)
            .unwrap();

        assert_eq!(summary.faces_added, 2);
        assert_eq!(mesh.group_face_count(summary.group), 2);
        assert_eq!(mesh.face_count(), 16);
        assert_eq!(mesh.groups()[summary.group], "junction");
        assert!(mesh.is_closed());
        assert!(mesh.is_manifold());
        let leg = 0.1 * 2.0_f64.sqrt();
        assert_relative_eq!(mesh.volume(), 1.0 - leg * leg / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn width_is_kept() {
        let mut mesh = unit_cube();
        let summary = Chamfer::new(vec![4, 5], Cutter::Width(0.2))
            .execute(&mut mesh)
            .unwrap();

        // the two junction corners on the x = 0 end are one width apart
        let mut ends: Vec<_> = mesh
            .faces()
            .filter(|(_, f)| f.track == summary.group)
            .flat_map(|(_, f)| f.corners)
            .filter(|&i| mesh.points()[i].x.abs() < 1e-12)
            .collect();
        ends.sort_unstable();
        ends.dedup();
        assert_eq!(ends.len(), 2);
        let width = (mesh.points()[ends[0]] - mesh.points()[ends[1]]).norm();
        assert_relative_eq!(width, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn straight_line_needs_no_corner() {
        let mut mesh = grid_box(2);
        let summary = Chamfer::new(vec![6, 7, 8], Cutter::Distance(0.1))
            .execute(&mut mesh)
            .unwrap();

        assert!(summary.boundaries.corners.is_empty());
        assert_eq!(summary.boundaries.edges.len(), 2);
        assert!(mesh.is_closed());
        let leg = 0.1 * 2.0_f64.sqrt();
        assert_relative_eq!(mesh.volume(), 2.0 - leg * leg, epsilon = 1e-12);
    }

    #[test]
    fn closed_loop_around_top_face() {
        let mut mesh = unit_cube();
        let summary = Chamfer::new(vec![4, 5, 7, 6, 4], Cutter::Distance(0.1))
            .execute(&mut mesh)
            .unwrap();

        assert!(summary.boundaries.corners.is_empty());
        assert!(mesh.is_closed());
        assert!(mesh.is_manifold());
        // four prisms of section leg^2 / 2, mitred at the corners
        let leg = 0.1 * 2.0_f64.sqrt();
        let removed = 2.0 * leg * leg * (1.0 - 2.0 * leg / 3.0);
        assert_relative_eq!(mesh.volume(), 1.0 - removed, epsilon = 1e-12);
    }

    #[test]
    fn bent_line_is_mitred() {
        let mut mesh = unit_cube();
        Chamfer::new(vec![4, 5, 7], Cutter::Distance(0.1))
            .execute(&mut mesh)
            .unwrap();

        assert!(mesh.is_closed());
        let leg = 0.1 * 2.0_f64.sqrt();
        assert_relative_eq!(mesh.volume(), 1.0 - leg * leg * (1.0 - leg / 3.0), epsilon = 1e-12);
    }

    #[test]
    fn three_lines_meeting_on_a_corner() {
        init_tracing();
        let mut mesh = unit_cube();
        let lines = vec![vec![7, 5], vec![7, 6], vec![7, 3]];
        let summary = Chamfer::from_lines(lines, Cutter::Distance(0.1))
            .execute(&mut mesh)
            .unwrap();

        for edge in &summary.boundaries.edges {
            assert!(!edge.segments.is_empty(), "edge {:?} was not cut", edge.edge);
        }
        // a quad per edge and the corner triangle
        assert_eq!(summary.faces_added, 7);
        assert!(mesh.is_closed());
        assert!(mesh.is_manifold());
        let leg = 0.1 * 2.0_f64.sqrt();
        let removed = 1.5 * leg * leg - 2.0 * leg.powi(3) / 3.0;
        assert_relative_eq!(mesh.volume(), 1.0 - removed, epsilon = 1e-12);
    }

    #[test]
    fn two_lines_meeting_on_a_corner() {
        let mut mesh = unit_cube();
        let lines = vec![vec![7, 5], vec![7, 6]];
        let summary = Chamfer::from_lines(lines, Cutter::Distance(0.1))
            .execute(&mut mesh)
            .unwrap();

        // a quad per edge and a corner quad reaching down edge 7-3
        assert_eq!(summary.faces_added, 6);
        assert!(mesh.is_closed());
        assert!(mesh.is_manifold());
        let leg = 0.1 * 2.0_f64.sqrt();
        assert_relative_eq!(mesh.volume(), 1.0 - leg * leg, epsilon = 1e-12);
    }

    #[test]
    fn zero_distance_changes_nothing() {
        let mut mesh = unit_cube();
        let summary = Chamfer::new(vec![4, 5], Cutter::Distance(0.0))
            .execute(&mut mesh)
            .unwrap();

        assert_eq!(summary.faces_added, 0);
        assert_eq!(summary.boundaries.segment_count(), 0);
        assert_eq!(mesh.face_count(), 12);
        assert_relative_eq!(mesh.volume(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn recut_edge_is_left_alone() {
        let mut mesh = unit_cube();
        let chamfer = Chamfer::new(vec![4, 5], Cutter::Distance(0.1));
        chamfer.execute(&mut mesh).unwrap();
        let volume = mesh.volume();

        // the edge has no faces left to cut
        let summary = chamfer.execute(&mut mesh).unwrap();
        assert_eq!(summary.faces_added, 0);
        assert_eq!(summary.boundaries.segment_count(), 0);
        assert_eq!(mesh.face_count(), 16);
        assert_relative_eq!(mesh.volume(), volume, epsilon = 1e-15);
    }

    #[test]
    fn explicit_tolerance_is_used() {
        let mut mesh = unit_cube();
        let params = CutParams {
            tolerance: Some(1e-9),
            ..CutParams::default()
        };
        Chamfer::new(vec![4, 5], Cutter::Distance(0.1))
            .with_params(params)
            .execute(&mut mesh)
            .unwrap();
        assert!(mesh.is_closed());
    }

    #[test]
    fn invalid_line_fails_before_cutting() {
        let mut mesh = unit_cube();
        let err = Chamfer::from_lines(vec![vec![4, 5], vec![3]], Cutter::Distance(0.1))
            .execute(&mut mesh)
            .unwrap_err();
        assert!(matches!(err, MeshcutError::Mesh(MeshError::InvalidLine(_))));
        assert_eq!(mesh.face_count(), 12);
        assert_eq!(mesh.groups().len(), 1);
    }
}
