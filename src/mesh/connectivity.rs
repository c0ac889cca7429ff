use std::collections::HashMap;

use super::{Face, FaceId, Mesh};

/// Directed edge to owning face index.
///
/// In a manifold mesh each directed edge belongs to at most one face, so the
/// face across an edge `(a, b)` is the owner of `(b, a)`. A missing entry
/// means the edge is on a boundary or its face has been cut away.
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    edges: HashMap<(usize, usize), FaceId>,
}

impl Connectivity {
    /// Indexes every face of the mesh.
    #[must_use]
    pub fn build(mesh: &Mesh) -> Self {
        let mut conn = Self {
            edges: HashMap::with_capacity(mesh.face_count() * 3),
        };
        for (id, face) in mesh.faces() {
            conn.register(id, face);
        }
        conn
    }

    /// Records the three directed edges of a face.
    pub fn register(&mut self, id: FaceId, face: &Face) {
        for edge in face.edges() {
            self.edges.insert(edge, id);
        }
    }

    /// Forgets the edges of a face, leaving entries owned by other faces alone.
    pub fn unregister(&mut self, id: FaceId, face: &Face) {
        for edge in face.edges() {
            if self.edges.get(&edge) == Some(&id) {
                self.edges.remove(&edge);
            }
        }
    }

    /// Face owning the directed edge.
    #[must_use]
    pub fn face(&self, edge: (usize, usize)) -> Option<FaceId> {
        self.edges.get(&edge).copied()
    }

    /// Directed edges starting at `point`.
    pub fn outgoing(&self, point: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.keys().copied().filter(move |&(a, _)| a == point)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    // --- Indexed mutation ---

    /// Replaces the corners of a mesh face and updates the index.
    pub fn replace_face(&mut self, mesh: &mut Mesh, id: FaceId, corners: [usize; 3]) {
        if let Some(previous) = mesh.replace_face(id, corners) {
            self.unregister(id, &previous);
            self.register(id, &Face::new(corners, previous.track));
        }
    }

    /// Appends a face to the mesh and indexes it.
    pub fn push_face(&mut self, mesh: &mut Mesh, corners: [usize; 3], track: usize) -> FaceId {
        let id = mesh.push_face(corners, track);
        self.register(id, &Face::new(corners, track));
        id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_meshes::unit_cube;

    #[test]
    fn cube_has_every_directed_edge() {
        let cube = unit_cube();
        let conn = Connectivity::build(&cube);
        assert_eq!(conn.len(), 36);
        let top = conn.face((4, 5)).unwrap();
        let front = conn.face((5, 4)).unwrap();
        assert_ne!(top, front);
        assert_eq!(cube.face(top).unwrap().corners, [4, 5, 7]);
        assert_eq!(cube.face(front).unwrap().corners, [0, 5, 4]);
    }

    #[test]
    fn outgoing_edges_of_corner() {
        let conn = Connectivity::build(&unit_cube());
        let mut targets: Vec<_> = conn.outgoing(7).map(|(_, b)| b).collect();
        targets.sort_unstable();
        assert_eq!(targets, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn replace_updates_index() {
        let mut cube = unit_cube();
        let mut conn = Connectivity::build(&cube);
        let id = conn.face((4, 5)).unwrap();
        let extra = cube.add_point(nalgebra::Point3::new(0.5, 0.0, 1.0));
        conn.replace_face(&mut cube, id, [4, extra, 7]);
        assert_eq!(conn.face((4, 5)), None);
        assert_eq!(conn.face((4, extra)), Some(id));
        assert_eq!(conn.face((extra, 7)), Some(id));
        assert_eq!(conn.face((7, 4)), Some(id));
    }

    #[test]
    fn unregister_keeps_foreign_entries() {
        let mut cube = unit_cube();
        let mut conn = Connectivity::build(&cube);
        let top = conn.face((4, 5)).unwrap();
        let other = conn.push_face(&mut cube, [4, 5, 6], 0);
        // The newer face now owns (4, 5); dropping the old face must not lose it.
        conn.unregister(top, &Face::new([4, 5, 7], 0));
        assert_eq!(conn.face((4, 5)), Some(other));
    }
}
