//! Visualization for tetrafractal
//!
//! This crate shows subdivision results in a window using wgpu and winit:
//! - Orbit camera with damping
//! - Control parameters edited from an egui panel or the keyboard
//! - Rotation and pulsation of the displayed model
//! - Double-sided lit mesh rendering

pub mod animation;
pub mod camera;
pub mod controls;
pub mod panel;
pub mod renderer;
pub mod shaders;
pub mod viewer;

pub use animation::*;
pub use camera::*;
pub use controls::*;
pub use panel::*;
pub use renderer::*;
pub use viewer::*;

use tetrafractal_core::Result;

/// Open a viewer with default settings and block until it is closed
pub fn show_fractal(depth: u32) -> Result<()> {
    let params = ControlParams {
        depth,
        ..ControlParams::default()
    };
    InteractiveViewer::new(ViewerConfig::default().with_params(params)).run()
}
