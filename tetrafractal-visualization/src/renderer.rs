//! wgpu renderer for the displayed fractal mesh

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use log::{debug, info, warn};
use tetrafractal_core::{Error, MeshBuffers, Result, Transform3D, TriangleMesh};
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use crate::camera::Camera;
use crate::panel::PanelFrame;
use crate::shaders::{FRAGMENT_ENTRY, MESH_SHADER, VERTEX_ENTRY};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertex layout uploaded for the fractal
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    /// Vertex buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleave positions with normals. Missing normals are computed first.
pub fn mesh_vertices(mesh: &TriangleMesh) -> Vec<MeshVertex> {
    let computed;
    let normals = match &mesh.normals {
        Some(normals) if normals.len() == mesh.vertices.len() => normals,
        _ => {
            let mut with_normals = mesh.clone();
            with_normals.compute_vertex_normals();
            computed = with_normals.normals.unwrap_or_default();
            &computed
        }
    };

    mesh.vertices
        .iter()
        .zip(normals)
        .map(|(p, n)| MeshVertex {
            position: [p.x, p.y, p.z],
            normal: [n.x, n.y, n.z],
        })
        .collect()
}

/// Convert a `0xRRGGBB` sRGB color to linear RGB
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xff) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

/// Scene colors, material and lights
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub background_color: u32,
    pub material_color: u32,
    pub metalness: f32,
    pub roughness: f32,
    pub ambient_color: u32,
    pub ambient_intensity: f32,
    pub light_color: u32,
    /// The directional light shines from here towards the origin
    pub light_position: [f32; 3],
    pub enable_multisampling: bool,
}

impl RenderConfig {
    pub fn with_background(mut self, color: u32) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_material(mut self, color: u32, metalness: f32, roughness: f32) -> Self {
        self.material_color = color;
        self.metalness = metalness.clamp(0.0, 1.0);
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_multisampling(mut self, enabled: bool) -> Self {
        self.enable_multisampling = enabled;
        self
    }

    fn sample_count(&self) -> u32 {
        if self.enable_multisampling {
            4
        } else {
            1
        }
    }

    fn clear_color(&self) -> wgpu::Color {
        let [r, g, b] = hex_to_linear(self.background_color);
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background_color: 0x111122,
            material_color: 0x0099ff,
            metalness: 0.3,
            roughness: 0.6,
            ambient_color: 0xaaaaaa,
            ambient_intensity: 1.0,
            light_color: 0xffffff,
            light_position: [5.0, 10.0, 7.5],
            enable_multisampling: true,
        }
    }
}

/// Per-frame uniform block, laid out to match `Scene` in the shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light: [f32; 4],
    pub light_color: [f32; 4],
    pub ambient: [f32; 4],
    pub base_color: [f32; 4],
    pub material: [f32; 4],
}

impl SceneUniform {
    pub fn new(
        camera: &Camera,
        model: &Transform3D,
        light_intensity: f32,
        config: &RenderConfig,
    ) -> Self {
        let eye = camera.position();
        let [lx, ly, lz] = config.light_position;
        let [lr, lg, lb] = hex_to_linear(config.light_color);
        let [ar, ag, ab] =
            hex_to_linear(config.ambient_color).map(|c| c * config.ambient_intensity);
        let [br, bg, bb] = hex_to_linear(config.material_color);

        Self {
            view_proj: camera.view_projection().into(),
            model: model.to_cols_array(),
            camera_position: [eye.x, eye.y, eye.z, 1.0],
            light: [lx, ly, lz, light_intensity],
            light_color: [lr, lg, lb, 1.0],
            ambient: [ar, ag, ab, 1.0],
            base_color: [br, bg, bb, 1.0],
            material: [config.metalness, config.roughness, 0.0, 0.0],
        }
    }
}

/// Vertex and index buffers of the mesh on screen
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    vertex_count: usize,
}

impl GpuMesh {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

/// Draws at most one mesh into a window surface
pub struct MeshRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    msaa_view: Option<wgpu::TextureView>,
    config: RenderConfig,
    mesh: Option<GpuMesh>,
    panel_renderer: egui_wgpu::Renderer,
}

impl MeshRenderer {
    /// Set up the device, surface and pipeline for `window`
    pub async fn new(window: Arc<Window>, config: RenderConfig) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let size = window.inner_size();
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Gpu(format!("Failed to create surface: {}", e)))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::Gpu("Failed to find suitable adapter".to_string()))?;
        info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("tetrafractal device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| Error::Gpu(format!("Failed to create device: {}", e)))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("Surface reports no texture formats".to_string()))?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let sample_count = config.sample_count();
        let pipeline = Self::create_pipeline(&device, &bind_group_layout, format, sample_count);
        let (depth_view, msaa_view) = Self::create_targets(&device, &surface_config, sample_count);
        // The panel is painted after the MSAA resolve, straight onto the surface
        let panel_renderer = egui_wgpu::Renderer::new(&device, format, None, 1);

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            pipeline,
            scene_buffer,
            scene_bind_group,
            depth_view,
            msaa_view,
            config,
            mesh: None,
            panel_renderer,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fractal Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(MESH_SHADER.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fractal Render Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Fractal Render Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: VERTEX_ENTRY,
                buffers: &[MeshVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: FRAGMENT_ENTRY,
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Both sides of every facet are visible
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    }

    fn create_targets(
        device: &wgpu::Device,
        surface_config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> (wgpu::TextureView, Option<wgpu::TextureView>) {
        let size = wgpu::Extent3d {
            width: surface_config.width,
            height: surface_config.height,
            depth_or_array_layers: 1,
        };

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        let msaa = (sample_count > 1).then(|| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("MSAA Texture"),
                    size,
                    mip_level_count: 1,
                    sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: surface_config.format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        (depth.create_view(&wgpu::TextureViewDescriptor::default()), msaa)
    }

    /// Replace the displayed mesh. The previous buffers are destroyed before
    /// the new ones are created.
    pub fn set_mesh(&mut self, mesh: &TriangleMesh) -> Result<()> {
        if mesh.is_empty() {
            return Err(Error::Visualization("Cannot display an empty mesh".to_string()));
        }
        let index_count = u32::try_from(mesh.faces.len() * 3)
            .map_err(|_| Error::Visualization("Mesh has too many indices".to_string()))?;

        self.clear_mesh();

        let vertices = mesh_vertices(mesh);
        let indices = mesh.flat_indices();

        let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fractal Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fractal Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        debug!(
            "Uploaded mesh: {} vertices, {} faces",
            vertices.len(),
            mesh.face_count()
        );
        self.mesh = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count,
            vertex_count: vertices.len(),
        });
        Ok(())
    }

    /// Rebuild a mesh with smooth normals from worker output and display it
    pub fn set_buffers(&mut self, buffers: &MeshBuffers) -> Result<()> {
        let mut mesh = TriangleMesh::from_buffers(buffers)?;
        mesh.compute_vertex_normals();
        self.set_mesh(&mesh)
    }

    /// Remove the displayed mesh and destroy its buffers
    pub fn clear_mesh(&mut self) {
        if let Some(mesh) = self.mesh.take() {
            debug!("Disposing mesh buffers ({} vertices)", mesh.vertex_count);
            mesh.destroy();
        }
    }

    /// Whether a mesh is displayed
    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Current surface size
    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.surface_config.width, self.surface_config.height)
    }

    /// Reconfigure the surface and recreate size-dependent targets
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.surface_config.width = new_size.width;
        self.surface_config.height = new_size.height;
        self.surface.configure(&self.device, &self.surface_config);

        let (depth_view, msaa_view) =
            Self::create_targets(&self.device, &self.surface_config, self.config.sample_count());
        self.depth_view = depth_view;
        self.msaa_view = msaa_view;
    }

    /// Draw one frame: the mesh, then the parameter panel on top
    pub fn render(
        &mut self,
        camera: &Camera,
        model: &Transform3D,
        light_intensity: f32,
        panel: &PanelFrame,
    ) -> Result<()> {
        // Texture uploads must not be lost with a skipped frame
        for (id, delta) in &panel.textures_delta.set {
            self.panel_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }

        let result = self.draw_frame(camera, model, light_intensity, panel);

        for id in &panel.textures_delta.free {
            self.panel_renderer.free_texture(id);
        }
        result
    }

    fn draw_frame(
        &mut self,
        camera: &Camera,
        model: &Transform3D,
        light_intensity: f32,
        panel: &PanelFrame,
    ) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost) | Err(wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                debug!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to get surface texture: {}", e))),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = SceneUniform::new(camera, model, light_intensity, &self.config);
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::bytes_of(&uniform));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Fractal Render Encoder"),
            });

        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point: panel.pixels_per_point,
        };
        let panel_commands = self.panel_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &panel.primitives,
            &screen,
        );

        let (target, resolve_target) = match &self.msaa_view {
            Some(msaa_view) => (msaa_view, Some(&view)),
            None => (&view, None),
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Fractal Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.config.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(mesh) = &self.mesh {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.scene_bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Panel Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.panel_renderer
                .render(&mut pass, &panel.primitives, &screen);
        }

        self.queue
            .submit(panel_commands.into_iter().chain(std::iter::once(encoder.finish())));
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tetrafractal_core::{generate, Depth, Point3f};

    #[test]
    fn test_vertex_layout_matches_shader() {
        assert_eq!(std::mem::size_of::<MeshVertex>(), 24);
        let desc = MeshVertex::desc();
        assert_eq!(desc.array_stride, 24);
        assert_eq!(desc.attributes.len(), 2);
        assert_eq!(desc.attributes[1].offset, 12);
    }

    #[test]
    fn test_uniform_is_std140_sized() {
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<SceneUniform>(), 2 * 64 + 6 * 16);
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(hex_to_linear(0xffffff), [1.0, 1.0, 1.0]);
        assert_eq!(hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
        let [r, g, b] = hex_to_linear(0x0099ff);
        assert_eq!(r, 0.0);
        assert_relative_eq!(g, 0.318_547, epsilon = 1e-4);
        assert_eq!(b, 1.0);
    }

    #[test]
    fn test_mesh_vertices_computes_missing_normals() {
        let buffers = generate(Depth::new(1).unwrap());
        let mesh = TriangleMesh::from_buffers(&buffers).unwrap();
        assert!(mesh.normals.is_none());

        let vertices = mesh_vertices(&mesh);
        assert_eq!(vertices.len(), buffers.vertex_count);
        for v in &vertices {
            let n = nalgebra::Vector3::from(v.normal);
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-5);
        }
        assert_eq!(buffers.vertex(0), Some(Point3f::from(vertices[0].position)));
    }

    #[test]
    fn test_scene_uniform_packs_config() {
        let config = RenderConfig::default();
        let uniform = SceneUniform::new(&Camera::default(), &Transform3D::identity(), 2.0, &config);

        assert_eq!(uniform.light, [5.0, 10.0, 7.5, 2.0]);
        assert_eq!(uniform.material, [0.3, 0.6, 0.0, 0.0]);
        assert_relative_eq!(uniform.camera_position[1], 4.0, epsilon = 1e-5);
        assert_eq!(uniform.model, Transform3D::identity().to_cols_array());
    }
}
