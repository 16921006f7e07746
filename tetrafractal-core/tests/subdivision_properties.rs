//! Integration tests for the subdivision-to-mesh pipeline
//!
//! These tests check the observable properties of complete runs: output
//! sizes, index validity, deduplication, determinism and facet winding.

use std::collections::HashSet;

use tetrafractal_core::*;

fn depth(d: u32) -> Depth {
    Depth::new(d).expect("depth in range")
}

/// Signed volume of the tetrahedron spanned by a face and a reference point.
/// Positive when the face normal (right-hand rule) points towards `reference`.
fn orientation(a: &Point3f, b: &Point3f, c: &Point3f, reference: &Point3f) -> f32 {
    (b - a).cross(&(c - a)).dot(&(reference - a))
}

#[test]
fn test_depth_zero_is_single_tetrahedron() {
    let buffers = generate(depth(0));

    assert_eq!(buffers.vertex_count, 4);
    assert_eq!(buffers.face_count(), 4);
    for face in buffers.indices.chunks_exact(3) {
        assert!(face.iter().all(|&i| i < 4));
        assert_ne!(face[0], face[1]);
        assert_ne!(face[1], face[2]);
        assert_ne!(face[0], face[2]);
    }
}

#[test]
fn test_face_count_and_index_validity() {
    for d in 0..=6 {
        let buffers = generate(depth(d));
        assert_eq!(buffers.face_count(), 4usize.pow(d + 1), "depth {}", d);
        assert_eq!(buffers.indices.len() % 3, 0);
        assert!(buffers
            .indices
            .iter()
            .all(|&i| (i as usize) < buffers.vertex_count));
        assert!(buffers.validate().is_ok());
    }
}

#[test]
fn test_depth_one_collapses_shared_midpoints() {
    let buffers = generate(depth(1));

    assert_eq!(buffers.face_count(), 16);
    assert!(buffers.vertex_count < 16);
    assert!(buffers.vertex_count >= 4);
    // 4 corners plus 6 edge midpoints
    assert_eq!(buffers.vertex_count, 10);
}

#[test]
fn test_vertex_dedup_is_idempotent() {
    let mut builder = GeometryBuilder::new();
    let p = Point3d::new(0.123_456_7, -1.5, 2.0);
    let first = builder.add_vertex(p);
    let second = builder.add_vertex(Point3d::new(0.123_457_1, -1.500_000_4, 2.0));

    assert_eq!(first, second);
    assert_eq!(builder.vertex_count(), 1);
}

#[test]
fn test_runs_are_deterministic() {
    let a = generate(depth(4));
    let b = generate(depth(4));

    assert_eq!(a.vertices, b.vertices);
    assert_eq!(a.indices, b.indices);
    assert_eq!(a.vertex_count, b.vertex_count);
}

#[test]
fn test_growth_is_strictly_increasing() {
    let runs: Vec<MeshBuffers> = (0..=6).map(|d| generate(depth(d))).collect();

    for pair in runs.windows(2) {
        assert!(pair[1].vertex_count > pair[0].vertex_count);
        assert!(pair[1].face_count() > pair[0].face_count());
    }
}

#[test]
fn test_no_duplicate_positions_survive() {
    let buffers = generate(depth(3));
    let keys: HashSet<VertexKey> = (0..buffers.vertex_count)
        .map(|i| {
            let p = buffers.vertex(i).unwrap();
            VertexKey::from_point(&Point3d::new(p.x as f64, p.y as f64, p.z as f64))
        })
        .collect();

    assert_eq!(keys.len(), buffers.vertex_count);
}

#[test]
fn test_leaf_facets_share_one_orientation() {
    // Every leaf emits 4 consecutive faces; all of them must sit on the same
    // side of their leaf's centroid.
    let mut builder = GeometryBuilder::new();
    subdivide(&mut builder, &Tetrahedron::default(), 0, 2);
    let mesh = builder.into_triangle_mesh();

    let reference_sign = {
        let f = mesh.faces[0];
        let centroid = leaf_centroid(&mesh, &mesh.faces[0..4]);
        orientation(
            &mesh.vertices[f[0] as usize],
            &mesh.vertices[f[1] as usize],
            &mesh.vertices[f[2] as usize],
            &centroid,
        )
        .signum()
    };

    for leaf in mesh.faces.chunks_exact(4) {
        let centroid = leaf_centroid(&mesh, leaf);
        for f in leaf {
            let o = orientation(
                &mesh.vertices[f[0] as usize],
                &mesh.vertices[f[1] as usize],
                &mesh.vertices[f[2] as usize],
                &centroid,
            );
            assert_eq!(o.signum(), reference_sign);
            assert!(o.abs() > 1e-3);
        }
    }
}

fn leaf_centroid(mesh: &TriangleMesh, leaf: &[[u32; 3]]) -> Point3f {
    let mut corners: Vec<u32> = leaf.iter().flatten().copied().collect();
    corners.sort_unstable();
    corners.dedup();
    assert_eq!(corners.len(), 4);

    let sum = corners
        .iter()
        .fold(Vector3f::zeros(), |acc, &i| acc + mesh.vertices[i as usize].coords);
    Point3f::from(sum / 4.0)
}

#[test]
fn test_vertex_normals_are_unit_length() {
    let buffers = generate(depth(3));
    let mut mesh = TriangleMesh::from_buffers(&buffers).unwrap();
    mesh.compute_vertex_normals();

    let normals = mesh.normals.as_ref().unwrap();
    assert_eq!(normals.len(), buffers.vertex_count);
    for n in normals {
        assert!((n.norm() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_fractal_stays_inside_root_bounds() {
    let buffers = generate(depth(5));
    let (min, max) = buffers.bounding_box();

    let s = ROOT_SIZE as f32;
    assert_eq!(min, Point3f::new(-s, -s, -s));
    assert_eq!(max, Point3f::new(s, s, s));
}

#[test]
fn test_buffers_serialize() {
    let buffers = generate(depth(1));
    let json = serde_json::to_string(&buffers).unwrap();
    let back: MeshBuffers = serde_json::from_str(&json).unwrap();
    assert_eq!(back, buffers);

    assert!(serde_json::from_str::<Depth>("12").is_err());
    assert_eq!(serde_json::from_str::<Depth>("2").unwrap(), depth(2));
}
