//! Core traits for tetrafractal

use crate::{mesh::*, point::*};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        Point3f::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        )
    }

    /// Radius of the sphere around `center` enclosing the bounding box
    fn bounding_radius(&self) -> f32 {
        let (min, max) = self.bounding_box();
        (max - min).norm() / 2.0
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        if self.vertices.is_empty() {
            return (Point3f::origin(), Point3f::origin());
        }

        let mut min = self.vertices[0];
        let mut max = self.vertices[0];

        for vertex in &self.vertices {
            min.x = min.x.min(vertex.x);
            min.y = min.y.min(vertex.y);
            min.z = min.z.min(vertex.z);

            max.x = max.x.max(vertex.x);
            max.y = max.y.max(vertex.y);
            max.z = max.z.max(vertex.z);
        }

        (min, max)
    }
}

impl Drawable for MeshBuffers {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        let mut positions = self
            .vertices
            .chunks_exact(3)
            .map(|c| Point3f::new(c[0], c[1], c[2]));

        let Some(first) = positions.next() else {
            return (Point3f::origin(), Point3f::origin());
        };

        positions.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounding_box_matches_between_representations() {
        let buffers = MeshBuffers {
            depth: 0,
            vertices: vec![-1.0, 0.0, 2.0, 3.0, -4.0, 0.5, 0.0, 1.0, -2.0],
            indices: vec![0, 1, 2],
            vertex_count: 3,
        };
        let mesh = TriangleMesh::from_buffers(&buffers).unwrap();

        let expected = (Point3f::new(-1.0, -4.0, -2.0), Point3f::new(3.0, 1.0, 2.0));
        assert_eq!(buffers.bounding_box(), expected);
        assert_eq!(mesh.bounding_box(), expected);
        assert_eq!(mesh.center(), Point3f::new(1.0, -1.5, 0.0));
    }

    #[test]
    fn test_empty_bounding_box() {
        let mesh = TriangleMesh::new();
        assert_eq!(mesh.bounding_box(), (Point3f::origin(), Point3f::origin()));
        assert_relative_eq!(mesh.bounding_radius(), 0.0);
    }
}
