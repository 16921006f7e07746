//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with single precision coordinates, used for GPU-facing data
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates, used while subdividing
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Arithmetic mean of two points.
///
/// Computed as `(a + b) * 0.5` so that midpoints shared by neighbouring
/// tetrahedra come out bit-identical regardless of argument order.
#[inline]
pub fn midpoint(a: &Point3d, b: &Point3d) -> Point3d {
    Point3d::from((a.coords + b.coords) * 0.5)
}

/// Narrow a double precision point to the GPU representation
#[inline]
pub fn to_point3f(p: &Point3d) -> Point3f {
    Point3f::new(p.x as f32, p.y as f32, p.z as f32)
}
