//! Recursive tetrahedral subdivision
//!
//! Every level splits a tetrahedron at its six edge midpoints and recurses
//! into the four corner tetrahedra only. The central octahedron is left out,
//! which hollows the solid out level by level into a Sierpinski tetrahedron.
//! At the target depth each leaf emits its four facets into a
//! [`GeometryBuilder`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::builder::GeometryBuilder;
use crate::error::{Error, Result};
use crate::mesh::MeshBuffers;
use crate::point::*;

/// Deepest subdivision accepted by [`Depth`]. Output grows as `4^depth`.
pub const MAX_DEPTH: u32 = 8;

/// Half edge of the cube the root tetrahedron is inscribed in
pub const ROOT_SIZE: f64 = 3.0;

/// Leaf facets as corner index triples, wound consistently across leaves
pub const LEAF_FACES: [[usize; 3]; 4] = [[0, 1, 2], [0, 2, 3], [0, 3, 1], [1, 3, 2]];

/// A validated target recursion depth in `0..=MAX_DEPTH`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Depth(u32);

impl Depth {
    /// The deepest accepted depth
    pub const MAX: Depth = Depth(MAX_DEPTH);

    /// Validate an integer depth
    pub fn new(depth: u32) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(invalid_depth(depth));
        }
        Ok(Self(depth))
    }

    /// Validate a depth coming from a floating point control.
    ///
    /// Negative, fractional and non-finite values are rejected.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > MAX_DEPTH as f64 {
            return Err(invalid_depth(value));
        }
        Ok(Self(value as u32))
    }

    /// The raw depth value
    pub fn get(self) -> u32 {
        self.0
    }
}

fn invalid_depth(value: impl fmt::Display) -> Error {
    Error::InvalidDepth {
        value: value.to_string(),
        max: MAX_DEPTH,
    }
}

impl TryFrom<u32> for Depth {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Depth {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map_err(|_| invalid_depth(value))
            .and_then(Self::new)
    }
}

impl From<Depth> for u32 {
    fn from(depth: Depth) -> Self {
        depth.0
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of leaf tetrahedra produced at `depth`
pub fn expected_leaf_count(depth: Depth) -> usize {
    4usize.pow(depth.get())
}

/// Number of triangles emitted at `depth`, before and after deduplication
pub fn expected_face_count(depth: Depth) -> usize {
    4 * expected_leaf_count(depth)
}

/// Number of distinct vertices at `depth`.
///
/// Each level quadruples the vertex set and merges the six midpoints shared
/// between sibling corner tetrahedra: `V(d + 1) = 4 V(d) - 6`, `V(0) = 4`.
pub fn expected_vertex_count(depth: Depth) -> usize {
    2 * expected_leaf_count(depth) + 2
}

/// A tetrahedron given by its four corners.
///
/// Corner order matters: it fixes the winding of the facets emitted for a
/// leaf and the order in which children are visited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tetrahedron {
    pub v1: Point3d,
    pub v2: Point3d,
    pub v3: Point3d,
    pub v4: Point3d,
}

impl Tetrahedron {
    /// Create a tetrahedron from four corners
    pub fn new(v1: Point3d, v2: Point3d, v3: Point3d, v4: Point3d) -> Self {
        Self { v1, v2, v3, v4 }
    }

    /// The regular tetrahedron inscribed in the cube `[-size, size]^3`,
    /// centered at the origin
    pub fn root(size: f64) -> Self {
        Self::new(
            Point3d::new(size, size, size),
            Point3d::new(-size, -size, size),
            Point3d::new(-size, size, -size),
            Point3d::new(size, -size, -size),
        )
    }

    /// Corners in order
    pub fn corners(&self) -> [Point3d; 4] {
        [self.v1, self.v2, self.v3, self.v4]
    }

    /// Mean of the four corners
    pub fn centroid(&self) -> Point3d {
        Point3d::from((self.v1.coords + self.v2.coords + self.v3.coords + self.v4.coords) / 4.0)
    }

    /// The four corner tetrahedra of the next level, in visiting order.
    ///
    /// Each child keeps one original corner in its original slot and takes
    /// the three incident edge midpoints for the other slots.
    pub fn children(&self) -> [Tetrahedron; 4] {
        let m12 = midpoint(&self.v1, &self.v2);
        let m13 = midpoint(&self.v1, &self.v3);
        let m14 = midpoint(&self.v1, &self.v4);
        let m23 = midpoint(&self.v2, &self.v3);
        let m24 = midpoint(&self.v2, &self.v4);
        let m34 = midpoint(&self.v3, &self.v4);

        [
            Tetrahedron::new(self.v1, m12, m13, m14),
            Tetrahedron::new(m12, self.v2, m23, m24),
            Tetrahedron::new(m13, m23, self.v3, m34),
            Tetrahedron::new(m14, m24, m34, self.v4),
        ]
    }

    /// Register the corners (v1 to v4) and emit the four leaf facets
    pub fn emit_faces(&self, builder: &mut GeometryBuilder) {
        let indices = self.corners().map(|corner| builder.add_vertex(corner));
        for [a, b, c] in LEAF_FACES {
            builder.add_face(indices[a], indices[b], indices[c]);
        }
    }
}

impl Default for Tetrahedron {
    fn default() -> Self {
        Self::root(ROOT_SIZE)
    }
}

/// Recursively subdivide `tetrahedron` until `target_depth`, emitting leaves
/// depth first into `builder`.
///
/// `current_depth` is 0 on the initial call.
pub fn subdivide(
    builder: &mut GeometryBuilder,
    tetrahedron: &Tetrahedron,
    current_depth: u32,
    target_depth: u32,
) {
    if current_depth >= target_depth {
        tetrahedron.emit_faces(builder);
        return;
    }

    for child in tetrahedron.children() {
        subdivide(builder, &child, current_depth + 1, target_depth);
    }
}

/// [`subdivide`] that checks `cancel` at every node and stops with
/// [`Error::Cancelled`] once it is set. The builder is left partially filled.
pub fn subdivide_cancellable(
    builder: &mut GeometryBuilder,
    tetrahedron: &Tetrahedron,
    current_depth: u32,
    target_depth: u32,
    cancel: &AtomicBool,
) -> Result<()> {
    if cancel.load(Ordering::Relaxed) {
        return Err(Error::Cancelled);
    }

    if current_depth >= target_depth {
        tetrahedron.emit_faces(builder);
        return Ok(());
    }

    for child in tetrahedron.children() {
        subdivide_cancellable(builder, &child, current_depth + 1, target_depth, cancel)?;
    }
    Ok(())
}

/// Run a complete subdivision of `root` in a fresh builder
pub fn generate_from(root: &Tetrahedron, depth: Depth) -> MeshBuffers {
    let mut builder = GeometryBuilder::with_capacity(
        expected_vertex_count(depth),
        expected_face_count(depth),
    );
    subdivide(&mut builder, root, 0, depth.get());
    finish(builder, depth)
}

/// Run a complete subdivision of the default root tetrahedron
pub fn generate(depth: Depth) -> MeshBuffers {
    generate_from(&Tetrahedron::default(), depth)
}

/// Run a complete subdivision of the default root tetrahedron, giving up
/// with [`Error::Cancelled`] as soon as `cancel` is observed set
pub fn generate_with_cancel(depth: Depth, cancel: &AtomicBool) -> Result<MeshBuffers> {
    let mut builder = GeometryBuilder::with_capacity(
        expected_vertex_count(depth),
        expected_face_count(depth),
    );
    subdivide_cancellable(&mut builder, &Tetrahedron::default(), 0, depth.get(), cancel)?;
    Ok(finish(builder, depth))
}

fn finish(builder: GeometryBuilder, depth: Depth) -> MeshBuffers {
    debug!(
        "Subdivision depth {}: {} vertices, {} faces",
        depth,
        builder.vertex_count(),
        builder.face_count()
    );
    builder.finish(depth.get())
}
