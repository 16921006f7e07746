//! Indexed geometry accumulation with vertex deduplication
//!
//! [`GeometryBuilder`] collects triangles emitted by the subdivision engine.
//! Points that coincide after rounding each coordinate to
//! [`KEY_PRECISION`] decimal places collapse into one vertex, so the seams
//! between neighbouring tetrahedra share vertices and smooth normals can be
//! computed downstream.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::mesh::{MeshBuffers, TriangleMesh};
use crate::point::*;

/// Number of decimal places kept when canonicalizing vertex positions
pub const KEY_PRECISION: i32 = 6;

/// Canonical spatial key of a vertex position.
///
/// Each coordinate is rounded independently to [`KEY_PRECISION`] decimal
/// places and stored as a scaled integer, so `0.0` and `-0.0` share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexKey([i64; 3]);

impl VertexKey {
    /// Compute the key of a point
    pub fn from_point(point: &Point3d) -> Self {
        Self([quantize(point.x), quantize(point.y), quantize(point.z)])
    }
}

#[inline]
fn quantize(coordinate: f64) -> i64 {
    let scale = 10f64.powi(KEY_PRECISION);
    (coordinate * scale).round() as i64
}

/// Accumulates deduplicated vertices and indexed triangles for one run
#[derive(Debug, Clone, Default)]
pub struct GeometryBuilder {
    vertices: Vec<Point3d>,
    index_of: HashMap<VertexKey, u32>,
    faces: Vec<[u32; 3]>,
}

impl GeometryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty builder with room for the given number of vertices and faces
    pub fn with_capacity(vertices: usize, faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertices),
            index_of: HashMap::with_capacity(vertices),
            faces: Vec::with_capacity(faces),
        }
    }

    /// Register a vertex and return its index.
    ///
    /// A point whose key is already known returns the existing index and
    /// leaves the builder untouched. Otherwise the raw, unrounded point is
    /// appended and receives the next sequential index.
    pub fn add_vertex(&mut self, point: Point3d) -> u32 {
        match self.index_of.entry(VertexKey::from_point(&point)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let index = self.vertices.len() as u32;
                self.vertices.push(point);
                entry.insert(index);
                index
            }
        }
    }

    /// Append a triangle. Index order is kept as given; it defines the winding.
    pub fn add_face(&mut self, i1: u32, i2: u32, i3: u32) {
        debug_assert!(
            [i1, i2, i3].iter().all(|&i| (i as usize) < self.vertices.len()),
            "face references an unregistered vertex"
        );
        self.faces.push([i1, i2, i3]);
    }

    /// Drop all vertices, keys and faces; the next vertex gets index 0 again
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.index_of.clear();
        self.faces.clear();
    }

    /// Number of distinct vertices registered so far
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles emitted so far
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Registered vertices in first-occurrence order
    pub fn vertices(&self) -> &[Point3d] {
        &self.vertices
    }

    /// Emitted triangles in insertion order
    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    /// Consume the builder into the flattened handoff buffers
    pub fn finish(self, depth: u32) -> MeshBuffers {
        let vertex_count = self.vertices.len();
        let vertices = self
            .vertices
            .iter()
            .flat_map(|p| [p.x as f32, p.y as f32, p.z as f32])
            .collect();
        let indices = self.faces.into_iter().flatten().collect();

        MeshBuffers {
            depth,
            vertices,
            indices,
            vertex_count,
        }
    }

    /// Consume the builder into a [`TriangleMesh`] without normals
    pub fn into_triangle_mesh(self) -> TriangleMesh {
        let vertices = self.vertices.iter().map(to_point3f).collect();
        TriangleMesh::from_vertices_and_faces(vertices, self.faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_sequential_from_zero() {
        let mut builder = GeometryBuilder::new();
        assert_eq!(builder.add_vertex(Point3d::new(0.0, 0.0, 0.0)), 0);
        assert_eq!(builder.add_vertex(Point3d::new(1.0, 0.0, 0.0)), 1);
        assert_eq!(builder.add_vertex(Point3d::new(0.0, 1.0, 0.0)), 2);
        assert_eq!(builder.vertex_count(), 3);
    }

    #[test]
    fn test_duplicate_within_precision_reuses_index() {
        let mut builder = GeometryBuilder::new();
        let first = builder.add_vertex(Point3d::new(1.0, 2.0, 3.0));
        let again = builder.add_vertex(Point3d::new(1.000_000_2, 1.999_999_8, 3.0));
        assert_eq!(first, again);
        assert_eq!(builder.vertex_count(), 1);
        // The stored position is the first raw point, not a rounded one
        assert_eq!(builder.vertices()[0], Point3d::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_points_outside_precision_stay_distinct() {
        let mut builder = GeometryBuilder::new();
        let a = builder.add_vertex(Point3d::new(0.5, 0.0, 0.0));
        let b = builder.add_vertex(Point3d::new(0.500_01, 0.0, 0.0));
        assert_ne!(a, b);
        assert_eq!(builder.vertex_count(), 2);
    }

    #[test]
    fn test_signed_zero_shares_key() {
        assert_eq!(
            VertexKey::from_point(&Point3d::new(0.0, -0.0, 0.0)),
            VertexKey::from_point(&Point3d::new(-0.0, 0.0, -0.000_000_1))
        );
    }

    #[test]
    fn test_face_order_is_preserved() {
        let mut builder = GeometryBuilder::new();
        for p in [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            builder.add_vertex(Point3d::new(p[0], p[1], p[2]));
        }
        builder.add_face(0, 1, 2);
        builder.add_face(2, 1, 0);
        assert_eq!(builder.faces(), &[[0, 1, 2], [2, 1, 0]]);
    }

    #[test]
    fn test_reset_restarts_indexing() {
        let mut builder = GeometryBuilder::new();
        builder.add_vertex(Point3d::new(1.0, 1.0, 1.0));
        builder.add_vertex(Point3d::new(2.0, 2.0, 2.0));
        builder.add_face(0, 1, 0);
        builder.reset();

        assert_eq!(builder.vertex_count(), 0);
        assert_eq!(builder.face_count(), 0);
        // A point seen before the reset is new again
        assert_eq!(builder.add_vertex(Point3d::new(2.0, 2.0, 2.0)), 0);
    }

    #[test]
    fn test_finish_flattens_in_order() {
        let mut builder = GeometryBuilder::new();
        let a = builder.add_vertex(Point3d::new(1.0, 2.0, 3.0));
        let b = builder.add_vertex(Point3d::new(4.0, 5.0, 6.0));
        let c = builder.add_vertex(Point3d::new(7.0, 8.0, 9.0));
        builder.add_face(c, a, b);

        let buffers = builder.finish(2);
        assert_eq!(buffers.depth, 2);
        assert_eq!(buffers.vertex_count, 3);
        assert_eq!(
            buffers.vertices,
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
        assert_eq!(buffers.indices, vec![2, 0, 1]);
        assert!(buffers.validate().is_ok());
    }
}
