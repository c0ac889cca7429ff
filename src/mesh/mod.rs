pub mod connectivity;
pub mod point_grid;

pub use connectivity::Connectivity;
pub use point_grid::PointGrid;

use std::collections::{HashMap, HashSet};

use slotmap::SlotMap;

use crate::error::MeshError;
use crate::math::polygon_3d::triangle_normal;
use crate::math::{Point3, Vector3, NUMPREC};

slotmap::new_key_type! {
    /// Unique identifier for a face in a [`Mesh`].
    ///
    /// Ids stay valid while faces are split and replaced during a cut; they
    /// are reassigned only when [`Mesh::remove_faces`] compacts the store.
    pub struct FaceId;
}

/// A triangular face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    /// Point indices, counter-clockwise seen from outside.
    pub corners: [usize; 3],
    /// Index of the group this face belongs to.
    pub track: usize,
}

impl Face {
    /// Creates a face.
    #[must_use]
    pub fn new(corners: [usize; 3], track: usize) -> Self {
        Self { corners, track }
    }

    /// The three directed edges of the face, in corner order.
    #[must_use]
    pub fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.corners;
        [(a, b), (b, c), (c, a)]
    }

    /// `true` when two corners share the same point index.
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        let [a, b, c] = self.corners;
        a == b || b == c || c == a
    }
}

/// Triangle mesh store.
///
/// Owns the points, the faces and the group labels faces refer to through
/// their track. Points are only ever appended, so a point index stays valid
/// for the lifetime of the mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    points: Vec<Point3>,
    faces: SlotMap<FaceId, Face>,
    groups: Vec<String>,
    grid: Option<(f64, PointGrid)>,
}

impl Mesh {
    /// Creates a mesh from points, faces, one track per face and group labels.
    ///
    /// # Errors
    ///
    /// Returns an error if a face refers to a missing point, if the number of
    /// tracks differs from the number of faces, or if a track has no group.
    pub fn new(
        points: Vec<Point3>,
        faces: Vec<[usize; 3]>,
        tracks: Vec<usize>,
        groups: Vec<String>,
    ) -> Result<Self, MeshError> {
        if faces.len() != tracks.len() {
            return Err(MeshError::TrackCountMismatch {
                faces: faces.len(),
                tracks: tracks.len(),
            });
        }

        let mut store = SlotMap::with_capacity_and_key(faces.len());
        for (corners, track) in faces.into_iter().zip(tracks) {
            if let Some(&index) = corners.iter().find(|&&i| i >= points.len()) {
                return Err(MeshError::PointOutOfRange {
                    index,
                    len: points.len(),
                });
            }
            if track >= groups.len() {
                return Err(MeshError::UnknownTrack {
                    track,
                    groups: groups.len(),
                });
            }
            store.insert(Face::new(corners, track));
        }

        Ok(Self {
            points,
            faces: store,
            groups,
            grid: None,
        })
    }

    /// Creates a mesh whose faces all belong to a single unnamed group.
    ///
    /// # Errors
    ///
    /// Returns an error if a face refers to a missing point.
    pub fn from_triangles(points: Vec<Point3>, faces: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        let tracks = vec![0; faces.len()];
        Self::new(points, faces, tracks, vec![String::new()])
    }

    // --- Queries ---

    /// All points, indexed by point id.
    #[must_use]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Faces in storage order.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, &Face)> {
        self.faces.iter()
    }

    /// Returns the face, or `None` if the id is stale.
    #[must_use]
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id)
    }

    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Group labels, indexed by track.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Number of faces carrying the given track.
    #[must_use]
    pub fn group_face_count(&self, track: usize) -> usize {
        self.faces.values().filter(|f| f.track == track).count()
    }

    /// Corner positions of a face.
    #[must_use]
    pub fn face_points(&self, id: FaceId) -> Option<[Point3; 3]> {
        self.faces.get(id).map(|f| self.corner_points(&f.corners))
    }

    /// Unit normal of a face, `None` for a stale id or a face without area.
    #[must_use]
    pub fn face_normal(&self, id: FaceId) -> Option<Vector3> {
        self.face_points(id).and_then(|pts| triangle_normal(&pts))
    }

    /// Positions of three point indices.
    #[must_use]
    pub fn corner_points(&self, corners: &[usize; 3]) -> [Point3; 3] {
        corners.map(|i| self.points[i])
    }

    /// Per-point normals, averaging adjacent face normals weighted by the
    /// corner angle. Points without faces get a zero vector.
    #[must_use]
    pub fn vertex_normals(&self) -> Vec<Vector3> {
        let mut normals = vec![Vector3::zeros(); self.points.len()];
        for face in self.faces.values() {
            let pts = self.corner_points(&face.corners);
            let Some(normal) = triangle_normal(&pts) else {
                continue;
            };
            for i in 0..3 {
                let to_next = pts[(i + 1) % 3] - pts[i];
                let to_prev = pts[(i + 2) % 3] - pts[i];
                normals[face.corners[i]] += normal * to_next.angle(&to_prev);
            }
        }
        for n in &mut normals {
            *n = n.try_normalize(0.0).unwrap_or_else(Vector3::zeros);
        }
        normals
    }

    /// Distance under which two points of this mesh are considered equal.
    ///
    /// Scales with the largest coordinate magnitude so that big models get a
    /// proportionally larger tolerance.
    #[must_use]
    pub fn precision(&self) -> f64 {
        let scale = self
            .points
            .iter()
            .flat_map(|p| p.iter().map(|c| c.abs()))
            .fold(0.0_f64, f64::max);
        (scale * NUMPREC * 8.0).max(NUMPREC)
    }

    /// Face corner triples in storage order.
    #[must_use]
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        self.faces.values().map(|f| f.corners).collect()
    }

    /// Enclosed volume, meaningful for closed outward-oriented meshes.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.faces
            .values()
            .map(|f| {
                let [a, b, c] = self.corner_points(&f.corners);
                a.coords.dot(&b.coords.cross(&c.coords))
            })
            .sum::<f64>()
            / 6.0
    }

    /// `true` if no directed edge is owned by two faces.
    #[must_use]
    pub fn is_manifold(&self) -> bool {
        let mut seen = HashSet::new();
        self.faces
            .values()
            .flat_map(Face::edges)
            .all(|edge| seen.insert(edge))
    }

    /// `true` if the mesh is manifold and every directed edge has its reverse.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        let mut edges = HashSet::new();
        for edge in self.faces.values().flat_map(Face::edges) {
            if !edges.insert(edge) {
                return false;
            }
        }
        edges.iter().all(|&(a, b)| edges.contains(&(b, a)))
    }

    // --- Mutation ---

    /// Appends a point and returns its index.
    pub fn add_point(&mut self, point: Point3) -> usize {
        let index = self.points.len();
        self.points.push(point);
        if let Some((_, grid)) = &mut self.grid {
            grid.insert(index, &point);
        }
        index
    }

    /// Returns the index of a point within `tolerance` of `point`, appending
    /// `point` when there is none.
    ///
    /// Calling it again with the same position and tolerance returns the same
    /// index.
    pub fn use_point_at(&mut self, point: Point3, tolerance: f64) -> usize {
        let stale = self.grid.as_ref().is_none_or(|(tol, _)| *tol != tolerance);
        if stale {
            let cell = (tolerance * 2.0).max(NUMPREC);
            self.grid = Some((tolerance, PointGrid::from_points(&self.points, cell)));
        }
        if let Some((_, grid)) = &self.grid {
            if let Some(index) = grid.nearest_within(&self.points, &point, tolerance) {
                return index;
            }
        }
        self.add_point(point)
    }

    /// Adds a group label and returns its track.
    pub fn add_group(&mut self, label: impl Into<String>) -> usize {
        self.groups.push(label.into());
        self.groups.len() - 1
    }

    /// Appends a face and returns its id.
    pub fn push_face(&mut self, corners: [usize; 3], track: usize) -> FaceId {
        self.faces.insert(Face::new(corners, track))
    }

    /// Replaces the corners of a face in place, keeping its id and track.
    ///
    /// Returns the previous face, or `None` if the id is stale.
    pub fn replace_face(&mut self, id: FaceId, corners: [usize; 3]) -> Option<Face> {
        let face = self.faces.get_mut(id)?;
        let previous = *face;
        face.corners = corners;
        Some(previous)
    }

    /// Substitutes point indices in every face according to `merges`.
    ///
    /// Faces whose corners collapse are kept; [`remove_faces`](Self::remove_faces)
    /// drops them afterwards.
    pub fn reindex_points(&mut self, merges: &HashMap<usize, usize>) {
        if merges.is_empty() {
            return;
        }
        for face in self.faces.values_mut() {
            face.corners = face.corners.map(|c| merges.get(&c).copied().unwrap_or(c));
        }
    }

    /// Drops every face for which `remove` returns `true` and compacts the
    /// store. Returns the number of faces removed.
    ///
    /// Surviving faces keep their relative order but receive new ids.
    pub fn remove_faces(&mut self, mut remove: impl FnMut(FaceId, &Face) -> bool) -> usize {
        let before = self.faces.len();
        let mut kept = SlotMap::with_capacity_and_key(before);
        for (id, face) in &self.faces {
            if !remove(id, face) {
                kept.insert(*face);
            }
        }
        self.faces = kept;
        before - self.faces.len()
    }
}
