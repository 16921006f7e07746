//! Core data structures and algorithms for tetrafractal
//!
//! This crate provides the subdivision-to-mesh pipeline: point types, the
//! deduplicating [`GeometryBuilder`], the recursive tetrahedral subdivision
//! engine and the flattened [`MeshBuffers`] handed to a renderer.
//!
//! ```
//! use tetrafractal_core::{generate, Depth};
//!
//! let buffers = generate(Depth::new(1)?);
//! assert_eq!(buffers.face_count(), 16);
//! assert_eq!(buffers.vertex_count, 10);
//! # Ok::<(), tetrafractal_core::Error>(())
//! ```

pub mod point;
pub mod mesh;
pub mod builder;
pub mod subdivision;
pub mod traits;
pub mod transform;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use builder::*;
pub use subdivision::*;
pub use traits::*;
pub use transform::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
