//! On-screen parameter panel drawn with egui
//!
//! The panel edits the same [`ControlParams`] as the keyboard bindings. It is
//! split into Subdivision, Motion and Lighting sections; only the Generate
//! button starts a run, so dragging the depth slider never blocks anything.

use egui::{ClippedPrimitive, Context, TexturesDelta, ViewportId};
use winit::{event::WindowEvent, window::Window};

use crate::controls::{
    ControlParams, ParamRange, LIGHT_INTENSITY_RANGE, PANEL_MAX_DEPTH, PULSATE_AMOUNT_RANGE,
    PULSATE_SPEED_RANGE, ROTATION_SPEED_RANGE,
};

/// What the panel reported for one frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PanelResponse {
    /// The Generate button was clicked
    pub generate: bool,
    /// At least one parameter was edited
    pub changed: bool,
}

/// Tessellated panel output, ready for the renderer
pub struct PanelFrame {
    pub primitives: Vec<ClippedPrimitive>,
    pub textures_delta: TexturesDelta,
    pub pixels_per_point: f32,
}

/// Lay out the panel for `params` and apply edits in place
pub fn control_panel(ctx: &Context, params: &mut ControlParams) -> PanelResponse {
    let before = params.clone();
    let mut generate = false;

    egui::SidePanel::right("controls")
        .resizable(false)
        .default_width(240.0)
        .show(ctx, |ui| {
            egui::CollapsingHeader::new("Subdivision")
                .default_open(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::Slider::new(&mut params.depth, 0..=PANEL_MAX_DEPTH)
                            .step_by(1.0)
                            .text("Depth"),
                    );
                    generate = ui.button("Generate").clicked();
                });

            egui::CollapsingHeader::new("Motion")
                .default_open(true)
                .show(ui, |ui| {
                    range_slider(
                        ui,
                        &mut params.rotation_speed_x,
                        ROTATION_SPEED_RANGE,
                        "Rotation X Speed",
                    );
                    range_slider(
                        ui,
                        &mut params.rotation_speed_y,
                        ROTATION_SPEED_RANGE,
                        "Rotation Y Speed",
                    );
                    ui.checkbox(&mut params.pulsate, "Pulsate Scale");
                    range_slider(
                        ui,
                        &mut params.pulsate_speed,
                        PULSATE_SPEED_RANGE,
                        "Pulsate Speed",
                    );
                    range_slider(
                        ui,
                        &mut params.pulsate_amount,
                        PULSATE_AMOUNT_RANGE,
                        "Pulsate Amount",
                    );
                });

            egui::CollapsingHeader::new("Lighting")
                .default_open(true)
                .show(ui, |ui| {
                    range_slider(
                        ui,
                        &mut params.light_intensity,
                        LIGHT_INTENSITY_RANGE,
                        "Light Intensity",
                    );
                });
        });

    let changed = *params != before;
    if changed {
        // Slider steps accumulate float error
        *params = params.clone().clamped();
    }
    PanelResponse { generate, changed }
}

fn range_slider(ui: &mut egui::Ui, value: &mut f32, range: ParamRange, label: &str) {
    ui.add(
        egui::Slider::new(value, range.min..=range.max)
            .step_by(range.step as f64)
            .text(label),
    );
}

/// egui context plus its winit input state for one window
pub struct ControlPanel {
    context: Context,
    state: egui_winit::State,
}

impl ControlPanel {
    pub fn new(window: &Window) -> Self {
        let context = Context::default();
        let state = egui_winit::State::new(
            context.clone(),
            ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
        );
        Self { context, state }
    }

    /// Feed a window event to egui. Returns true if the panel used it, in
    /// which case the camera should ignore it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Run one panel frame against `params`
    pub fn run(
        &mut self,
        window: &Window,
        params: &mut ControlParams,
    ) -> (PanelResponse, PanelFrame) {
        let input = self.state.take_egui_input(window);
        let mut response = PanelResponse::default();
        let output = self.context.run(input, |ctx| {
            response = control_panel(ctx, params);
        });
        self.state
            .handle_platform_output(window, output.platform_output);

        let primitives = self
            .context
            .tessellate(output.shapes, output.pixels_per_point);
        let frame = PanelFrame {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        };
        (response, frame)
    }
}
