// Renderer module for the robot room

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec3};
use log::{debug, error, info};
use robot_room::assembly::{PartRole, Shape};
use robot_room::{Renderable, World};
use wgpu::util::DeviceExt;
use wgpu::{Adapter, Buffer, RenderPipeline};
use winit::{
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use crate::mesh::{self, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SHAPES: [Shape; 4] = [Shape::Cube, Shape::Sphere, Shape::Plane, Shape::Triangle];

const THRESHOLD_STEP: f32 = 0.5;
const INTENSITY_STEP: f32 = 0.1;

// Per-instance model matrix and colour
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceRaw {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// Uniform buffer structure, mirrored in shader.wgsl
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    spot_position: [f32; 4],
    spot_direction: [f32; 4],
    spot_cutoffs: [f32; 4],
    global_light: [f32; 4],
}

impl Uniforms {
    fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            spot_position: [0.0; 4],
            spot_direction: [0.0, -1.0, 0.0, 0.0],
            spot_cutoffs: [0.9, 0.8, 0.0, 0.0],
            global_light: [0.0; 4],
        }
    }

    fn update_view_proj(&mut self, view_proj: Mat4) {
        self.view_proj = view_proj.to_cols_array_2d();
    }

    fn update_lights(&mut self, world: &World) {
        let spot = world.spotlight();
        self.spot_position = spot.position.extend(1.0).to_array();
        self.spot_direction = spot.direction.extend(spot.intensity).to_array();
        self.spot_cutoffs = [spot.inner_cutoff, spot.outer_cutoff, 0.0, 0.0];
        let global = world.global_light();
        self.global_light = global.position.extend(global.intensity).to_array();
    }
}

/// Instances queued by the scene's leaves during one draw pass.
#[derive(Default)]
struct DrawList {
    instances: HashMap<Shape, Vec<InstanceRaw>>,
}

impl DrawList {
    fn take(&mut self, shape: Shape) -> Vec<InstanceRaw> {
        self.instances.remove(&shape).unwrap_or_default()
    }
}

/// A scene leaf drawn as one instance of a shared mesh.
struct GpuPart {
    name: String,
    shape: Shape,
    color: [f32; 4],
    draw_list: Rc<RefCell<DrawList>>,
    released: bool,
}

impl GpuPart {
    fn new(rig: &str, role: &PartRole, draw_list: Rc<RefCell<DrawList>>) -> Self {
        let [r, g, b] = role.color;
        Self {
            name: format!("{rig} {}", role.name),
            shape: role.shape,
            color: [r, g, b, 1.0],
            draw_list,
            released: false,
        }
    }
}

impl Renderable for GpuPart {
    fn render(&mut self, world: &Mat4) {
        if self.released {
            return;
        }
        self.draw_list
            .borrow_mut()
            .instances
            .entry(self.shape)
            .or_default()
            .push(InstanceRaw {
                model: world.to_cols_array_2d(),
                color: self.color,
            });
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            debug!("released {}", self.name);
        }
    }
}

struct GpuMesh {
    shape: Shape,
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    index_count: u32,
}

#[derive(Default)]
struct KeyboardState {
    w: bool,
    a: bool,
    s: bool,
    d: bool,
}

pub struct Renderer {
    adapter: Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    window: Arc<winit::window::Window>,
    pipeline: RenderPipeline,
    meshes: Vec<GpuMesh>,
    depth_view: wgpu::TextureView,
    uniform_buffer: Buffer,
    uniform_bind_group: wgpu::BindGroup,
    surface_format: wgpu::TextureFormat,
    camera_yaw: f32,
    camera_pitch: f32,
    camera_distance: f32,
    start_time: Instant,
    keys_pressed: KeyboardState,
    draw_list: Rc<RefCell<DrawList>>,
    world: World,
    exit_requested: bool,
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl Renderer {
    pub async fn new(event_loop: &EventLoop<()>) -> Self {
        // Create window with Arc for shared ownership
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("Robot Room")
                .build(event_loop)
                .expect("Failed to create window"),
        );

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("No suitable graphics adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Renderer Device"),
                    required_features: wgpu::Features::default(),
                    required_limits: wgpu::Limits::default(),
                },
                None, // Trace path
            )
            .await
            .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let size = window.inner_size();
        surface.configure(
            &device,
            &wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format: surface_format,
                width: size.width.max(1),
                height: size.height.max(1),
                present_mode: surface_caps.present_modes[0],
                alpha_mode: surface_caps.alpha_modes[0],
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            },
        );
        let depth_view = create_depth_view(&device, size.width, size.height);

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Bind Group Layout"),
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

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[Vertex::layout(), InstanceRaw::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // room panels are seen from both sides
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
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let meshes = SHAPES
            .into_iter()
            .map(|shape| {
                let data = mesh::build(shape);
                GpuMesh {
                    shape,
                    vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Vertex Buffer"),
                        contents: bytemuck::cast_slice(&data.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                    index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Index Buffer"),
                        contents: bytemuck::cast_slice(&data.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
                    index_count: data.indices.len() as u32,
                }
            })
            .collect();

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Uniform Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let draw_list = Rc::new(RefCell::new(DrawList::default()));
        let mut factory = |rig: &str, role: &PartRole| -> Box<dyn Renderable> {
            Box::new(GpuPart::new(rig, role, draw_list.clone()))
        };
        let world = World::new(&mut factory, 0.0).expect("Failed to assemble the room");
        info!("room assembled with {} scene nodes", world.graph().node_count());

        Self {
            adapter,
            device,
            queue,
            surface,
            window,
            pipeline,
            meshes,
            depth_view,
            uniform_buffer,
            uniform_bind_group,
            surface_format,
            camera_yaw: 0.6,
            camera_pitch: 0.45,
            camera_distance: 24.0,
            start_time: Instant::now(),
            keys_pressed: KeyboardState::default(),
            draw_list,
            world,
            exit_requested: false,
        }
    }

    pub fn run(mut self, event_loop: EventLoop<()>) {
        let result = event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent {
                    window_id,
                    event: WindowEvent::CloseRequested,
                } if window_id == self.window.id() => {
                    self.world.shutdown();
                    target.exit();
                }
                Event::WindowEvent {
                    event: WindowEvent::Resized(physical_size),
                    window_id,
                } if window_id == self.window.id() => {
                    self.resize(physical_size);
                }
                Event::AboutToWait => {
                    self.window.request_redraw();
                }
                Event::WindowEvent {
                    event: WindowEvent::RedrawRequested,
                    window_id,
                } if window_id == self.window.id() => {
                    self.update_and_render();
                }
                Event::WindowEvent {
                    event: WindowEvent::KeyboardInput { event, .. },
                    window_id,
                } if window_id == self.window.id() => {
                    self.handle_keyboard_input(event);
                    if self.exit_requested {
                        self.world.shutdown();
                        target.exit();
                    }
                }
                _ => {}
            }
        });
        if let Err(err) = result {
            error!("event loop terminated: {err}");
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        let surface_caps = self.surface.get_capabilities(&self.adapter);

        self.surface.configure(
            &self.device,
            &wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format: self.surface_format,
                width: new_size.width,
                height: new_size.height,
                present_mode: surface_caps.present_modes[0],
                alpha_mode: surface_caps.alpha_modes[0],
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            },
        );
        self.depth_view = create_depth_view(&self.device, new_size.width, new_size.height);
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) {
        let PhysicalKey::Code(keycode) = event.physical_key else {
            return;
        };
        let is_pressed = event.state == ElementState::Pressed;
        match keycode {
            KeyCode::KeyW => self.keys_pressed.w = is_pressed,
            KeyCode::KeyA => self.keys_pressed.a = is_pressed,
            KeyCode::KeyS => self.keys_pressed.s = is_pressed,
            KeyCode::KeyD => self.keys_pressed.d = is_pressed,
            _ => {}
        }
        if !is_pressed || event.repeat {
            return;
        }

        let now = self.start_time.elapsed().as_secs_f64();
        match keycode {
            KeyCode::Digit1 => self.world.toggle_dance(now),
            KeyCode::Digit2 => self.world.toggle_patrol(),
            KeyCode::Equal => self.world.adjust_threshold(THRESHOLD_STEP),
            KeyCode::Minus => self.world.adjust_threshold(-THRESHOLD_STEP),
            KeyCode::BracketRight => self.world.adjust_spotlight(INTENSITY_STEP),
            KeyCode::BracketLeft => self.world.adjust_spotlight(-INTENSITY_STEP),
            KeyCode::Period => self.world.adjust_global_light(INTENSITY_STEP),
            KeyCode::Comma => self.world.adjust_global_light(-INTENSITY_STEP),
            KeyCode::Escape => self.exit_requested = true,
            _ => {}
        }
    }

    fn update_and_render(&mut self) {
        // Orbit the camera based on keyboard input
        let rotation_speed = 2.0 * 0.016; // Assuming ~60 FPS

        if self.keys_pressed.w {
            self.camera_pitch += rotation_speed;
        }
        if self.keys_pressed.s {
            self.camera_pitch -= rotation_speed;
        }
        if self.keys_pressed.a {
            self.camera_yaw -= rotation_speed;
        }
        if self.keys_pressed.d {
            self.camera_yaw += rotation_speed;
        }
        self.camera_pitch = self.camera_pitch.clamp(-1.4, 1.4);

        let now = self.start_time.elapsed().as_secs_f64();
        if let Err(err) = self.world.frame(now) {
            error!("frame at {now:.3}s failed: {err}");
            return;
        }

        let size = self.window.inner_size();
        let aspect_ratio = size.width.max(1) as f32 / size.height.max(1) as f32;

        let target = Vec3::new(0.0, 4.0, 0.0);
        let eye = target
            + self.camera_distance
                * Vec3::new(
                    self.camera_pitch.cos() * self.camera_yaw.sin(),
                    self.camera_pitch.sin(),
                    self.camera_pitch.cos() * self.camera_yaw.cos(),
                );
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let projection = Mat4::perspective_rh(45.0_f32.to_radians(), aspect_ratio, 0.1, 100.0);

        let mut uniforms = Uniforms::new();
        uniforms.update_view_proj(projection * view);
        uniforms.update_lights(&self.world);
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        self.render();
    }

    fn render(&mut self) {
        // Take this frame's instances even if the surface is unavailable
        let batches: Vec<(usize, Buffer, u32)> = {
            let mut draw_list = self.draw_list.borrow_mut();
            self.meshes
                .iter()
                .enumerate()
                .filter_map(|(index, mesh)| {
                    let instances = draw_list.take(mesh.shape);
                    if instances.is_empty() {
                        return None;
                    }
                    let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Instance Buffer"),
                        contents: bytemuck::cast_slice(&instances),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                    Some((index, buffer, instances.len() as u32))
                })
                .collect()
        };

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                debug!("surface unavailable ({err}), reconfiguring");
                self.resize(self.window.inner_size());
                return;
            }
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
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
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            for (index, instances, count) in &batches {
                let mesh = &self.meshes[*index];
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_vertex_buffer(1, instances.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..*count);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}
