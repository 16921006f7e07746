//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Flattened output of one subdivision run.
///
/// This is the message handed from the worker back to the caller: positions
/// as `xyz` triples, triangles as index triples, and the number of distinct
/// vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub depth: u32,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub vertex_count: usize,
}

impl MeshBuffers {
    /// Number of triangles in the index buffer
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the buffers hold no geometry
    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0 || self.indices.is_empty()
    }

    /// Position of a vertex, if the index is in range
    pub fn vertex(&self, index: usize) -> Option<Point3f> {
        if index >= self.vertex_count {
            return None;
        }
        let base = index.checked_mul(3)?;
        self.vertices
            .get(base..base.checked_add(3)?)
            .map(|xyz| Point3f::new(xyz[0], xyz[1], xyz[2]))
    }

    /// Check the buffer invariants: positions come in triples matching the
    /// vertex count, indices come in triples, and every index is in range.
    pub fn validate(&self) -> Result<()> {
        if self.vertices.len() != self.vertex_count * 3 {
            return Err(Error::InvalidData(format!(
                "vertex buffer holds {} floats, expected {} for {} vertices",
                self.vertices.len(),
                self.vertex_count * 3,
                self.vertex_count
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        if let Some(&bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertex_count)
        {
            return Err(Error::InvalidData(format!(
                "index {} out of range for {} vertices",
                bad, self.vertex_count
            )));
        }
        Ok(())
    }
}

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vector3f>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Rebuild a mesh from flattened subdivision output
    pub fn from_buffers(buffers: &MeshBuffers) -> Result<Self> {
        buffers.validate()?;

        let vertices = buffers
            .vertices
            .chunks_exact(3)
            .map(|c| Point3f::new(c[0], c[1], c[2]))
            .collect();
        let faces = buffers
            .indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();

        Ok(Self::from_vertices_and_faces(vertices, faces))
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Calculate unit face normals from the winding of each triangle
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0] as usize];
                let v1 = self.vertices[face[1] as usize];
                let v2 = self.vertices[face[2] as usize];

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1.cross(&edge2).normalize()
            })
            .collect()
    }

    /// Compute smooth per-vertex normals from triangle winding.
    ///
    /// Unnormalized face normals (whose length is twice the triangle area)
    /// are summed at every vertex of the face, then normalized. Vertices that
    /// are shared between faces therefore get one blended normal; this is why
    /// seam vertices must be deduplicated before this step.
    pub fn compute_vertex_normals(&mut self) {
        let mut accumulated = vec![Vector3f::zeros(); self.vertices.len()];

        for &face in &self.faces {
            let [a, b, c] = face.map(|i| i as usize);
            let edge1 = self.vertices[b] - self.vertices[a];
            let edge2 = self.vertices[c] - self.vertices[a];
            let weighted = edge1.cross(&edge2);

            accumulated[a] += weighted;
            accumulated[b] += weighted;
            accumulated[c] += weighted;
        }

        for normal in accumulated.iter_mut() {
            if normal.norm_squared() > 1e-20 {
                normal.normalize_mut();
            }
        }

        self.normals = Some(accumulated);
    }

    /// Flattened index buffer
    pub fn flat_indices(&self) -> Vec<u32> {
        self.faces.iter().flatten().copied().collect()
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_single_triangle() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
    }

    #[test]
    fn test_face_normal_follows_winding() {
        let mut mesh = make_single_triangle();
        let normals = mesh.calculate_face_normals();
        assert_relative_eq!(normals[0], Vector3f::new(0.0, 0.0, 1.0));

        mesh.faces[0] = [0, 2, 1];
        let flipped = mesh.calculate_face_normals();
        assert_relative_eq!(flipped[0], Vector3f::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_vertex_normals_blend_shared_vertices() {
        // Two triangles folded along the x axis share vertices 0 and 1
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, -1.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        );
        mesh.compute_vertex_normals();
        let normals = mesh.normals.as_ref().unwrap();

        assert_relative_eq!(normals[2], Vector3f::new(0.0, 0.0, 1.0));
        assert_relative_eq!(normals[3], Vector3f::new(0.0, 1.0, 0.0));

        let blended = Vector3f::new(0.0, 1.0, 1.0).normalize();
        assert_relative_eq!(normals[0], blended, epsilon = 1e-6);
        assert_relative_eq!(normals[1], blended, epsilon = 1e-6);
    }

    #[test]
    fn test_from_buffers_round_trip_shape() {
        let buffers = MeshBuffers {
            depth: 0,
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            vertex_count: 3,
        };
        let mesh = TriangleMesh::from_buffers(&buffers).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(mesh.flat_indices(), buffers.indices);
        assert_eq!(buffers.vertex(1), Some(Point3f::new(1.0, 0.0, 0.0)));
        assert_eq!(buffers.vertex(3), None);
    }

    #[test]
    fn test_validate_rejects_out_of_range_index() {
        let buffers = MeshBuffers {
            depth: 0,
            vertices: vec![0.0; 9],
            indices: vec![0, 1, 3],
            vertex_count: 3,
        };
        assert!(matches!(buffers.validate(), Err(Error::InvalidData(_))));
        assert!(TriangleMesh::from_buffers(&buffers).is_err());
    }

    #[test]
    fn test_validate_rejects_ragged_buffers() {
        let ragged_vertices = MeshBuffers {
            depth: 0,
            vertices: vec![0.0; 8],
            indices: vec![0, 1, 2],
            vertex_count: 3,
        };
        assert!(ragged_vertices.validate().is_err());

        let ragged_indices = MeshBuffers {
            depth: 0,
            vertices: vec![0.0; 9],
            indices: vec![0, 1],
            vertex_count: 3,
        };
        assert!(ragged_indices.validate().is_err());
    }

    #[test]
    fn test_vertex_on_short_buffer_is_none() {
        let buffers = MeshBuffers {
            depth: 0,
            vertices: vec![1.0, 2.0, 3.0],
            indices: Vec::new(),
            vertex_count: 2,
        };
        assert_eq!(buffers.vertex(0), Some(Point3f::new(1.0, 2.0, 3.0)));
        assert_eq!(buffers.vertex(1), None);
        assert_eq!(buffers.vertex(2), None);
        assert_eq!(buffers.vertex(usize::MAX), None);
    }
}
