//! Cutting operations: each cuts a mesh along polylines and closes the hole
//! with a junction surface.

mod bevel;
mod chamfer;

pub use bevel::Bevel;
pub use chamfer::Chamfer;

use crate::cut::CutBoundaries;
use crate::error::JunctionError;

/// What an operation did to the mesh.
#[derive(Debug, Default)]
pub struct JunctionSummary {
    /// Boundaries left by the cut, after simplification.
    pub boundaries: CutBoundaries,
    /// Track of the group holding the junction faces.
    pub group: usize,
    /// Number of faces added to close the cut.
    pub faces_added: usize,
    /// Cut edges left open.
    pub unresolved: Vec<JunctionError>,
}
