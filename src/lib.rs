pub mod cut;
pub mod error;
pub mod junction;
pub mod math;
pub mod mesh;
pub mod operations;

#[cfg(test)]
pub(crate) mod test_meshes;

pub use cut::{CutParams, Cutter, Resolution};
pub use error::{MeshcutError, Result};
pub use junction::{Interpolation, TangentSource};
pub use mesh::{Connectivity, Face, FaceId, Mesh};
pub use operations::{Bevel, Chamfer, JunctionSummary};
