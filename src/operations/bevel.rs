use tracing::debug;

use crate::cut::policy::edge_normals;
use crate::cut::{cut, CutParams, Cutter};
use crate::error::Result;
use crate::junction::tangent::{tangent_junction, EdgeNormals};
use crate::junction::TangentSource;
use crate::mesh::{Connectivity, Mesh};

use super::JunctionSummary;

/// Cuts a mesh along polylines and closes every cut with a rounded surface
/// tangent to the faces left on each side.
#[derive(Debug, Clone)]
pub struct Bevel {
    lines: Vec<Vec<usize>>,
    cutter: Cutter,
    params: CutParams,
    tangents: TangentSource,
}

impl Bevel {
    /// Creates a new `Bevel` along one polyline of point indices.
    #[must_use]
    pub fn new(line: Vec<usize>, cutter: Cutter) -> Self {
        Self::from_lines(vec![line], cutter)
    }

    /// Creates a new `Bevel` along several polylines cut together.
    #[must_use]
    pub fn from_lines(lines: Vec<Vec<usize>>, cutter: Cutter) -> Self {
        Self {
            lines,
            cutter,
            params: CutParams::default(),
            tangents: TangentSource::default(),
        }
    }

    /// Replaces the default parameters.
    #[must_use]
    pub fn with_params(mut self, params: CutParams) -> Self {
        self.params = params;
        self
    }

    /// Chooses the normals the rounded surface is tangent to.
    #[must_use]
    pub fn with_tangents(mut self, tangents: TangentSource) -> Self {
        self.tangents = tangents;
        self
    }

    /// Executes the bevel. Strip faces go to a new `"junction"` group.
    ///
    /// Edges whose boundary cannot be split between their two faces are left
    /// open and listed in [`JunctionSummary::unresolved`].
    ///
    /// # Errors
    ///
    /// Returns an error if a polyline is invalid, the resolution yields no
    /// subdivision count, or a flat part cannot be triangulated.
    pub fn execute(&self, mesh: &mut Mesh) -> Result<JunctionSummary> {
        let tolerance = self.params.tolerance_for(mesh);

        let conn = Connectivity::build(mesh);
        let mut normals = EdgeNormals::new();
        for line in &self.lines {
            for (w, pair) in line.windows(2).zip(edge_normals(mesh, &conn, line)) {
                if let Some(pair) = pair {
                    normals.insert((w[0], w[1]), pair);
                }
            }
        }

        let boundaries = cut(mesh, &self.lines, &self.cutter, tolerance)?;
        let group = mesh.add_group("junction");
        let fill = tangent_junction(
            mesh,
            &boundaries,
            &normals,
            self.tangents,
            group,
            &self.params,
            tolerance,
        )?;
        debug!(
            lines = self.lines.len(),
            faces_added = fill.faces_added,
            unresolved = fill.unresolved.len(),
            "bevel done"
        );

        Ok(JunctionSummary {
            boundaries,
            group,
            faces_added: fill.faces_added,
            unresolved: fill.unresolved,
        })
    }
}
