//! Per-frame motion of the displayed fractal

use tetrafractal_core::Transform3D;

use crate::controls::ControlParams;

/// Rotation and scale of the displayed model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelMotion {
    /// Euler angles in radians, applied X then Y then Z
    pub rotation: [f32; 3],
    pub scale: f32,
}

impl ModelMotion {
    pub fn new() -> Self {
        Self {
            rotation: [0.0; 3],
            scale: 1.0,
        }
    }

    /// Advance one frame. `elapsed_secs` is the time since the viewer started.
    ///
    /// Rotation grows by a fixed amount per frame, so its rate follows the
    /// frame rate. Scale is a pure function of time while pulsating.
    pub fn advance(&mut self, params: &ControlParams, elapsed_secs: f32) {
        self.rotation[0] += params.rotation_speed_x;
        self.rotation[1] += params.rotation_speed_y;
        self.scale = pulsate_scale(params, elapsed_secs);
    }

    /// Back to no rotation and unit scale; a freshly generated mesh starts here
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Model matrix: rotate, then scale uniformly
    pub fn model_transform(&self) -> Transform3D {
        let [x, y, z] = self.rotation;
        Transform3D::rotation_xyz(x, y, z) * Transform3D::uniform_scaling(self.scale)
    }
}

impl Default for ModelMotion {
    fn default() -> Self {
        Self::new()
    }
}

/// `1 + amount * sin(speed * t)` while pulsating, else 1
pub fn pulsate_scale(params: &ControlParams, elapsed_secs: f32) -> f32 {
    if params.pulsate {
        1.0 + params.pulsate_amount * (params.pulsate_speed * elapsed_secs).sin()
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tetrafractal_core::Point3f;

    #[test]
    fn test_rotation_accumulates_per_frame() {
        let params = ControlParams::default();
        let mut motion = ModelMotion::new();
        for frame in 0..10 {
            motion.advance(&params, frame as f32 / 60.0);
        }
        assert_relative_eq!(motion.rotation[0], 0.02, epsilon = 1e-6);
        assert_relative_eq!(motion.rotation[1], 0.03, epsilon = 1e-6);
        assert_eq!(motion.rotation[2], 0.0);
        assert_eq!(motion.scale, 1.0);
    }

    #[test]
    fn test_pulsate_formula() {
        let params = ControlParams {
            pulsate: true,
            pulsate_speed: 0.8,
            pulsate_amount: 0.03,
            ..ControlParams::default()
        };
        let t = std::f32::consts::FRAC_PI_2 / 0.8;
        assert_relative_eq!(pulsate_scale(&params, t), 1.03, epsilon = 1e-6);
        assert_relative_eq!(pulsate_scale(&params, 0.0), 1.0);
        assert_relative_eq!(pulsate_scale(&params, 3.0 * t), 0.97, epsilon = 1e-5);
    }

    #[test]
    fn test_turning_pulsate_off_restores_unit_scale() {
        let mut params = ControlParams {
            pulsate: true,
            ..ControlParams::default()
        };
        let mut motion = ModelMotion::new();
        motion.advance(&params, 1.0);
        assert!(motion.scale != 1.0);

        params.pulsate = false;
        motion.advance(&params, 2.0);
        assert_eq!(motion.scale, 1.0);
    }

    #[test]
    fn test_model_transform() {
        let motion = ModelMotion {
            rotation: [0.0, std::f32::consts::FRAC_PI_2, 0.0],
            scale: 2.0,
        };
        let p = motion.model_transform().transform_point(&Point3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3f::new(0.0, 0.0, -2.0), epsilon = 1e-5);

        let mut moved = motion;
        moved.reset();
        assert_eq!(moved, ModelMotion::default());
    }
}
