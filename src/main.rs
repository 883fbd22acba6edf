use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use pointflow_core::CameraProfile;
use pointflow_engine::{Phase, RenderBuffers, Session, DEFAULT_CAPACITY};
use pointflow_render::{create_depth_texture, CameraUniform, PointBuffers, PointPipeline};
use pointflow_track::{ReplayConfig, ReplayTracker};
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

mod camera;

use crate::camera::OrbitCamera;

#[derive(Parser)]
#[command(name = "pointflow")]
#[command(about = "Interactive viewer for incrementally reconstructed RGB-D point clouds")]
struct Args {
    /// Dataset archive (tar)
    archive: PathBuf,

    /// Camera profile: fr1, fr2, fr3, icl
    #[arg(short, long, default_value = "fr1")]
    profile: String,

    /// Point store capacity
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: u32,

    /// Sample every Nth pixel in both axes
    #[arg(long, default_value = "4")]
    stride: u32,
}

struct State {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,

    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    pipeline: PointPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    point_buffers: PointBuffers,
    session: Session,
    camera: OrbitCamera,

    blob: Vec<u8>,
    profile: CameraProfile,
}

impl State {
    async fn new(window: Arc<Window>, args: &Args) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapters found")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Pointflow Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .context("request_device failed")?;
        let queue = Arc::new(queue);

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);

        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
            wgpu::PresentMode::Mailbox
        } else {
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let (depth_texture, depth_view) =
            create_depth_texture(&device, config.width, config.height);

        let blob = std::fs::read(&args.archive)
            .with_context(|| format!("failed to read archive: {}", args.archive.display()))?;
        let profile: CameraProfile = args.profile.parse()?;

        let tracker = ReplayTracker::new(ReplayConfig {
            stride: args.stride,
            ..ReplayConfig::default()
        });
        let mut session = Session::new(Box::new(tracker), args.capacity);
        session
            .load(&blob, profile)
            .context("failed to load archive")?;

        let point_buffers = PointBuffers::new(&device, Arc::clone(&queue), args.capacity);
        let pipeline = PointPipeline::new(&device, surface_format);

        let camera = OrbitCamera::new(Vec3::new(0.0, 0.0, 1.0), 4.0);
        let aspect = config.width as f32 / config.height as f32;
        let uniform = CameraUniform::new(camera.view_proj(aspect));

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BindGroup"),
            layout: &pipeline.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth_texture,
            depth_view,
            pipeline,
            camera_buffer,
            camera_bind_group,
            point_buffers,
            session,
            camera,
            blob,
            profile,
        })
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        let (depth_texture, depth_view) =
            create_depth_texture(&self.device, self.config.width, self.config.height);
        self.depth_texture = depth_texture;
        self.depth_view = depth_view;
    }

    /// Consume one frame and keep the vertex buffers synchronized.
    fn step(&mut self) {
        self.session.step(&mut self.point_buffers);
    }

    fn reload(&mut self) {
        self.point_buffers.set_visible_count(0);
        match self.session.load(&self.blob, self.profile) {
            Ok(frames) => tracing::info!(frames, "archive reloaded"),
            Err(error) => tracing::error!(%error, "reload failed"),
        }
    }

    fn update(&mut self) {
        let aspect = self.config.width as f32 / self.config.height.max(1) as f32;
        let uniform = CameraUniform::new(self.camera.view_proj(aspect));
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    fn status(&self) -> String {
        let stats = self.session.stats();
        match stats.phase {
            Phase::Idle => "idle".to_string(),
            Phase::Done => format!(
                "done | {} pts | {} lost",
                stats.valid_points, stats.frames_lost
            ),
            Phase::Indexed | Phase::Tracking => format!(
                "frame {}/{} | {} pts | {} lost",
                stats.next_frame_id, stats.frame_count, stats.valid_points, stats.frames_lost
            ),
        }
    }

    fn render(&mut self) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(f) => f,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                anyhow::bail!("Surface out of memory");
            }
            Err(e) => {
                return Err(anyhow::anyhow!(e));
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
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
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&self.pipeline.pipeline);
            rpass.set_bind_group(0, &self.camera_bind_group, &[]);
            self.point_buffers.draw(&mut rpass);
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

struct App {
    args: Args,
    window: Option<Arc<Window>>,
    state: Option<State>,

    // Input state
    dragging: bool,
    paused: bool,
}

impl App {
    fn new(args: Args) -> Self {
        Self {
            args,
            window: None,
            state: None,
            dragging: false,
            paused: false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attrs = Window::default_attributes()
            .with_title("pointflow")
            .with_inner_size(PhysicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(attrs).unwrap());
        let state = pollster::block_on(State::new(Arc::clone(&window), &self.args))
            .expect("failed to start viewer");

        self.window = Some(window);
        self.state = Some(state);

        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.resize(size);
                }
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => self.paused = !self.paused,
                KeyCode::KeyR => {
                    if let Some(state) = &mut self.state {
                        state.reload();
                    }
                }
                _ => {}
            },

            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = button_state == ElementState::Pressed;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(state) = &mut self.state {
                    let steps = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(p) => p.y as f32 / 120.0,
                    };
                    state.camera.zoom(steps);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(state) = &mut self.state {
                    if !self.paused {
                        state.step();
                    }
                    state.update();
                    if let Err(error) = state.render() {
                        tracing::error!(%error, "render failed");
                        event_loop.exit();
                    }
                }

                if let (Some(window), Some(state)) = (&self.window, &self.state) {
                    window.set_title(&format!("pointflow | {}", state.status()));
                    window.request_redraw();
                }
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _: &ActiveEventLoop,
        _: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.dragging {
                if let Some(state) = &mut self.state {
                    state.camera.orbit(dx as f32, dy as f32);
                }
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(args);
    event_loop.run_app(&mut app)?;

    Ok(())
}
