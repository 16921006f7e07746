//! Interactive fractal viewer
//!
//! The window loop never blocks on subdivision. Generation requests go to a
//! [`SubdivisionDispatcher`], which is polled once per loop iteration; the
//! mesh on screen is only replaced when the newest run delivers.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info};
use tetrafractal_core::{Error, Result};
use tetrafractal_worker::{Completion, SubdivisionDispatcher, WorkerConfig};
use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use crate::animation::ModelMotion;
use crate::camera::Camera;
use crate::controls::{ControlAction, ControlParams, KEY_BINDINGS};
use crate::panel::ControlPanel;
use crate::renderer::{MeshRenderer, RenderConfig};

/// Pixels of wheel movement counted as one zoom step
const PIXELS_PER_ZOOM_STEP: f32 = 50.0;

/// Viewer window and startup settings
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub params: ControlParams,
    pub render: RenderConfig,
    pub worker: WorkerConfig,
    /// Dispatch a run at the initial depth as soon as the window is up
    pub generate_on_start: bool,
}

impl ViewerConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_params(mut self, params: ControlParams) -> Self {
        self.params = params.clamped();
        self
    }

    pub fn with_render_config(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn with_worker_config(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_generate_on_start(mut self, generate: bool) -> Self {
        self.generate_on_start = generate;
        self
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "tetrafractal".to_string(),
            width: 1200,
            height: 800,
            params: ControlParams::default(),
            render: RenderConfig::default(),
            worker: WorkerConfig::default(),
            generate_on_start: true,
        }
    }
}

/// What the event loop should do after an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Interactive viewer state; the window and GPU live in [`run`](Self::run)
pub struct InteractiveViewer {
    config: ViewerConfig,
    camera: Camera,
    params: ControlParams,
    motion: ModelMotion,
    dispatcher: SubdivisionDispatcher,
    last_mouse_pos: Option<PhysicalPosition<f64>>,
    left_pressed: bool,
    right_pressed: bool,
    started: Instant,
    displayed: Option<(u32, usize, usize)>,
}

impl InteractiveViewer {
    /// Create a viewer
    pub fn new(config: ViewerConfig) -> Self {
        let mut camera = Camera::default();
        camera.aspect_ratio = config.width as f32 / config.height.max(1) as f32;

        Self {
            camera,
            params: config.params.clone(),
            motion: ModelMotion::new(),
            dispatcher: SubdivisionDispatcher::new(config.worker.clone()),
            last_mouse_pos: None,
            left_pressed: false,
            right_pressed: false,
            started: Instant::now(),
            displayed: None,
            config,
        }
    }

    /// Current control values
    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    /// Whether a requested mesh has not arrived yet
    pub fn is_generating(&self) -> bool {
        self.dispatcher.is_busy()
    }

    /// Window title with the current control values and status
    pub fn title(&self) -> String {
        let mut title = format!("{} | {}", self.config.title, self.params.summary());
        if let Some((depth, vertices, faces)) = self.displayed {
            title.push_str(&format!(
                " | showing d{}: {} vertices, {} faces",
                depth, vertices, faces
            ));
        }
        if self.is_generating() {
            title.push_str(" | generating...");
        }
        title
    }

    /// Start a run at the current depth, superseding any run in flight
    pub fn generate(&mut self) {
        match self.dispatcher.dispatch(self.params.depth) {
            Ok(generation) => {
                debug!("Dispatched run {} at depth {}", generation, self.params.depth)
            }
            Err(e) => error!("Could not start subdivision: {}", e),
        }
    }

    /// React to a control action
    pub fn handle_action(&mut self, action: ControlAction) -> Flow {
        match action {
            ControlAction::Quit => return Flow::Exit,
            ControlAction::Generate => self.generate(),
            ControlAction::ResetCamera => self.camera.reset(),
            ControlAction::Help => {
                for (key, description) in KEY_BINDINGS {
                    info!("{:>10}  {}", key, description);
                }
            }
            _ => {
                if self.params.apply(action) {
                    debug!("Controls: {}", self.params.summary());
                }
            }
        }
        Flow::Continue
    }

    fn handle_key(&mut self, key: &Key) -> Flow {
        let action = match key {
            Key::Named(NamedKey::Escape) => Some(ControlAction::Quit),
            Key::Named(NamedKey::Enter) => Some(ControlAction::Generate),
            Key::Character(c) => ControlAction::from_key(c.as_str()),
            _ => None,
        };
        action.map_or(Flow::Continue, |action| self.handle_action(action))
    }

    fn handle_cursor(&mut self, position: PhysicalPosition<f64>, viewport_height: f32) {
        if let Some(last) = self.last_mouse_pos {
            let dx = (position.x - last.x) as f32 / viewport_height;
            let dy = (position.y - last.y) as f32 / viewport_height;

            if self.left_pressed {
                self.camera
                    .orbit(std::f32::consts::TAU * dx, std::f32::consts::TAU * dy);
            } else if self.right_pressed {
                self.camera.pan(dx, dy);
            }
        }
        self.last_mouse_pos = Some(position);
    }

    /// Swap in a delivered mesh; on failure the current mesh stays
    fn apply_completion(&mut self, completion: Completion, renderer: &mut MeshRenderer) {
        let depth = completion.depth;
        match completion.outcome {
            Ok(buffers) => match renderer.set_buffers(&buffers) {
                Ok(()) => {
                    self.motion.reset();
                    self.displayed =
                        Some((depth.get(), buffers.vertex_count, buffers.face_count()));
                    info!(
                        "Depth {} ready after {:.2?}: {} vertices, {} faces",
                        depth,
                        completion.elapsed,
                        buffers.vertex_count,
                        buffers.face_count()
                    );
                }
                Err(e) => error!("Could not display depth {}: {}", depth, e),
            },
            Err(Error::Cancelled) => debug!("Run {} was cancelled", completion.generation),
            Err(e) => error!(
                "Subdivision at depth {} failed, keeping current mesh: {}",
                depth, e
            ),
        }
    }

    /// Open the window and run until it is closed
    pub fn run(mut self) -> Result<()> {
        info!("Starting tetrafractal viewer");

        let event_loop = EventLoop::new()
            .map_err(|e| Error::Visualization(format!("Failed to create event loop: {}", e)))?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(self.title())
                .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
                .build(&event_loop)
                .map_err(|e| Error::Visualization(format!("Failed to create window: {}", e)))?,
        );

        let mut renderer = pollster::block_on(MeshRenderer::new(
            Arc::clone(&window),
            self.config.render.clone(),
        ))?;
        let mut panel = ControlPanel::new(&window);
        let size = renderer.size();
        self.camera.aspect_ratio = size.width as f32 / size.height as f32;

        if self.config.generate_on_start {
            self.generate();
        }
        let mut title = self.title();
        window.set_title(&title);

        event_loop
            .run(move |event, elwt| {
                elwt.set_control_flow(ControlFlow::Poll);

                match event {
                    Event::WindowEvent { window_id, event } if window_id == window.id() => {
                        let consumed = panel.on_window_event(&window, &event);
                        match event {
                            WindowEvent::CloseRequested => elwt.exit(),
                            WindowEvent::Resized(new_size) => {
                                renderer.resize(new_size);
                                if new_size.height > 0 {
                                    self.camera.aspect_ratio =
                                        new_size.width as f32 / new_size.height as f32;
                                }
                            }
                            WindowEvent::MouseInput { state, button, .. } => {
                                // Drags that start on the panel never reach the camera
                                let pressed = state == ElementState::Pressed && !consumed;
                                match button {
                                    MouseButton::Left => self.left_pressed = pressed,
                                    MouseButton::Right => self.right_pressed = pressed,
                                    _ => {}
                                }
                            }
                            WindowEvent::CursorMoved { position, .. } => {
                                let height = renderer.size().height.max(1) as f32;
                                self.handle_cursor(position, height);
                            }
                            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                                let steps = match delta {
                                    MouseScrollDelta::LineDelta(_, y) => y,
                                    MouseScrollDelta::PixelDelta(pos) => {
                                        pos.y as f32 / PIXELS_PER_ZOOM_STEP
                                    }
                                };
                                self.camera.zoom(steps);
                            }
                            WindowEvent::KeyboardInput { event, .. } if !consumed => {
                                if event.state == ElementState::Pressed
                                    && self.handle_key(&event.logical_key) == Flow::Exit
                                {
                                    elwt.exit();
                                }
                            }
                            WindowEvent::RedrawRequested => {
                                self.camera.update();
                                if renderer.has_mesh() {
                                    let elapsed = self.started.elapsed().as_secs_f32();
                                    self.motion.advance(&self.params, elapsed);
                                }

                                let (response, frame) = panel.run(&window, &mut self.params);
                                if response.changed {
                                    debug!("Controls: {}", self.params.summary());
                                }
                                if response.generate {
                                    self.generate();
                                }

                                let model = self.motion.model_transform();
                                let light = self.params.light_intensity;
                                let rendered =
                                    renderer.render(&self.camera, &model, light, &frame);
                                if let Err(e) = rendered {
                                    error!("Render error: {}", e);
                                    elwt.exit();
                                }
                            }
                            _ => {}
                        }
                    }
                    Event::AboutToWait => {
                        if let Some(completion) = self.dispatcher.poll() {
                            self.apply_completion(completion, &mut renderer);
                        }

                        let current = self.title();
                        if current != title {
                            window.set_title(&current);
                            title = current;
                        }
                        window.request_redraw();
                    }
                    Event::LoopExiting => {
                        self.dispatcher.cancel_all();
                        renderer.clear_mesh();
                        info!("Viewer closed");
                    }
                    _ => {}
                }
            })
            .map_err(|e| Error::Visualization(format!("Event loop error: {}", e)))?;

        Ok(())
    }
}

impl Default for InteractiveViewer {
    fn default() -> Self {
        Self::new(ViewerConfig::default())
    }
}
