//! Orbit camera for the fractal viewer

use std::f32::consts::FRAC_PI_2;

use nalgebra::{Matrix4, Perspective3, Point3, Vector2, Vector3};

/// Maps nalgebra's OpenGL clip depth (-1..1) to wgpu's (0..1)
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Elevation stays this far away from the poles
const POLE_MARGIN: f32 = 1e-3;

/// Camera orbiting a target point on a sphere.
///
/// Rotation and panning input is accumulated and released over several
/// [`update`](Camera::update) calls when damping is enabled, which gives the
/// motion inertia.
#[derive(Debug, Clone)]
pub struct Camera {
    pub target: Point3<f32>,
    pub radius: f32,
    /// Angle around the vertical axis, 0 looking down -Z
    pub azimuth: f32,
    /// Angle above the horizontal plane
    pub elevation: f32,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of pending motion applied per update (0 = no damping)
    pub damping: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pending_orbit: Vector2<f32>,
    pending_pan: Vector3<f32>,
    home: (Point3<f32>, f32, f32, f32),
}

impl Camera {
    /// Camera at `eye` looking at `target`
    pub fn new(eye: Point3<f32>, target: Point3<f32>, fov: f32, aspect_ratio: f32) -> Self {
        let offset = eye - target;
        let radius = offset.norm().max(f32::EPSILON);
        let azimuth = offset.x.atan2(offset.z);
        let elevation = (offset.y / radius).clamp(-1.0, 1.0).asin();

        Self {
            target,
            radius,
            azimuth,
            elevation: clamp_elevation(elevation),
            fov,
            aspect_ratio,
            near: 0.1,
            far: 1000.0,
            damping: 0.05,
            min_radius: 0.5,
            max_radius: 200.0,
            pending_orbit: Vector2::zeros(),
            pending_pan: Vector3::zeros(),
            home: (target, radius, azimuth, clamp_elevation(elevation)),
        }
    }

    /// Set the damping factor; 0 applies input immediately
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping.clamp(0.0, 1.0);
        self
    }

    /// Eye position in world space
    pub fn position(&self) -> Point3<f32> {
        let (sin_el, cos_el) = self.elevation.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.target + Vector3::new(cos_el * sin_az, sin_el, cos_el * cos_az) * self.radius
    }

    /// World to camera transform
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position(), &self.target, &Vector3::y())
    }

    /// Perspective projection in wgpu clip space
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let perspective = Perspective3::new(self.aspect_ratio, self.fov, self.near, self.far);
        OPENGL_TO_WGPU_MATRIX * perspective.into_inner()
    }

    /// Combined projection and view
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Queue a rotation around the target, in radians
    pub fn orbit(&mut self, horizontal: f32, vertical: f32) {
        self.pending_orbit += Vector2::new(horizontal, vertical);
        if self.damping == 0.0 {
            self.update();
        }
    }

    /// Queue a translation of the target in the view plane.
    ///
    /// `dx` and `dy` are fractions of the viewport height, so dragging across
    /// the whole window moves the target by the visible extent.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(&Vector3::y()).normalize();
        let up = right.cross(&forward);
        let extent = 2.0 * self.radius * (self.fov * 0.5).tan();

        self.pending_pan += (-right * dx + up * dy) * extent;
        if self.damping == 0.0 {
            self.update();
        }
    }

    /// Move towards (positive) or away from (negative) the target
    pub fn zoom(&mut self, delta: f32) {
        self.radius = (self.radius * 0.95f32.powf(delta)).clamp(self.min_radius, self.max_radius);
    }

    /// Return to the initial view and drop pending motion
    pub fn reset(&mut self) {
        let (target, radius, azimuth, elevation) = self.home;
        self.target = target;
        self.radius = radius;
        self.azimuth = azimuth;
        self.elevation = elevation;
        self.pending_orbit = Vector2::zeros();
        self.pending_pan = Vector3::zeros();
    }

    /// Apply pending motion. Call once per frame.
    pub fn update(&mut self) {
        let factor = if self.damping > 0.0 { self.damping } else { 1.0 };

        let orbit_step = self.pending_orbit * factor;
        self.azimuth -= orbit_step.x;
        self.elevation = clamp_elevation(self.elevation + orbit_step.y);
        self.pending_orbit -= orbit_step;

        let pan_step = self.pending_pan * factor;
        self.target += pan_step;
        self.pending_pan -= pan_step;

        if self.pending_orbit.norm_squared() < 1e-12 {
            self.pending_orbit = Vector2::zeros();
        }
        if self.pending_pan.norm_squared() < 1e-12 {
            self.pending_pan = Vector3::zeros();
        }
    }

    /// Whether damped motion is still being released
    pub fn is_moving(&self) -> bool {
        self.pending_orbit != Vector2::zeros() || self.pending_pan != Vector3::zeros()
    }
}

fn clamp_elevation(elevation: f32) -> f32 {
    elevation.clamp(-FRAC_PI_2 + POLE_MARGIN, FRAC_PI_2 - POLE_MARGIN)
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(3.0, 4.0, 5.0),
            Point3::origin(),
            75f32.to_radians(),
            1200.0 / 800.0,
        )
    }
}
