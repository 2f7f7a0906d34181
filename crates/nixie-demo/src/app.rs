use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use nixie_engine::coords::{Rect, Vec2, Viewport};
use nixie_engine::device::{Gpu, GpuInit, SurfaceErrorAction};
use nixie_engine::engine::{Drop, RippleEngine, RipplesConfig};
use nixie_engine::render::{RenderCtx, RenderTarget};
use nixie_engine::scheduler::{FrameScheduler, SchedulerId};

// Pointer disturbance strengths, tuned for the default drop radius.
const MOVE_STRENGTH: f32 = 0.01;
const CLICK_STRENGTH: f32 = 0.14;
const CLICK_RADIUS_SCALE: f32 = 1.5;

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

pub struct App {
    image_path: Option<PathBuf>,
    entry: Option<WindowEntry>,
    engine: Option<Rc<RefCell<RippleEngine>>>,
    engine_id: Option<SchedulerId>,
    scheduler: FrameScheduler,
    pointer: Option<Vec2>,
}

impl App {
    pub fn new(image_path: Option<PathBuf>) -> Self {
        Self {
            image_path,
            entry: None,
            engine: None,
            engine_id: None,
            scheduler: FrameScheduler::new(),
            pointer: None,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        event_loop
            .run_app(&mut self)
            .context("winit event loop terminated with error")?;
        Ok(())
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("nixie ripples")
            .with_inner_size(LogicalSize::new(960.0, 600.0));
        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let entry = WindowEntryBuilder {
            window,
            gpu_builder: |w| {
                pollster::block_on(Gpu::new(w, GpuInit::default()))
                    .expect("GPU initialization failed for window")
            },
        }
        .build();

        let config = RipplesConfig {
            image_url: self.image_path.as_ref().map(|p| p.display().to_string()),
            on_initialized: Some(Box::new(|| log::info!("ripple surface initialized"))),
            ..RipplesConfig::default()
        };

        let engine = entry.with_gpu(|gpu| -> Result<RippleEngine> {
            let image_url = config.image_url.clone();
            let ctx = render_ctx(gpu);
            let mut engine = RippleEngine::new(&ctx, gpu.capabilities(), config)
                .context("failed to build ripple engine")?;

            if let Some(path) = image_url {
                match image::open(&path) {
                    Ok(decoded) => {
                        let rgba = decoded.to_rgba8();
                        let (w, h) = rgba.dimensions();
                        engine.set_background_image(&ctx, w, h, &rgba)?;
                        log::info!("background loaded from {path} ({w}x{h})");
                    }
                    Err(err) => {
                        // Same fallback as a failed network image: keep the
                        // transparent placeholder and keep rippling.
                        log::warn!("could not decode {path}: {err}");
                    }
                }
            }
            Ok(engine)
        })?;

        let engine = Rc::new(RefCell::new(engine));
        self.engine_id = Some(self.scheduler.register(engine.clone()));
        self.engine = Some(engine);
        self.entry = Some(entry);
        Ok(())
    }

    fn disturb(&mut self, position: Vec2, radius_scale: f32, strength: f32) {
        let (Some(entry), Some(engine)) = (&self.entry, &self.engine) else {
            return;
        };
        let mut engine = engine.borrow_mut();
        if !engine.pointer_enabled() {
            return;
        }
        let drop = Drop {
            position,
            radius: engine.drop_radius() * radius_scale,
            strength,
        };
        entry.with_gpu(|gpu| {
            if let Err(err) = engine.drop_at(&render_ctx(gpu), drop) {
                log::warn!("drop rejected: {err}");
            }
        });
        entry.with_window(|w| w.request_redraw());
    }

    fn redraw(&mut self) {
        let Some(entry) = &mut self.entry else {
            return;
        };
        let scheduler = &mut self.scheduler;

        entry.with_mut(|fields| {
            let gpu = fields.gpu;
            let mut frame = match gpu.begin_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    match gpu.handle_surface_error(err) {
                        SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                            fields.window.request_redraw();
                        }
                        SurfaceErrorAction::Fatal => {
                            log::error!("fatal surface error; stopping redraws");
                        }
                    }
                    return;
                }
            };

            // Clear first so a hidden engine leaves a blank frame.
            frame
                .encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("nixie clear pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &frame.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                    multiview_mask: None,
                });

            let ctx = render_ctx(gpu);
            {
                let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
                scheduler.tick(&ctx, &mut target);
            }
            gpu.submit(frame);

            if scheduler.is_active() {
                fields.window.request_redraw();
            }
        });
    }

    fn teardown(&mut self, event_loop: &ActiveEventLoop) {
        if let (Some(engine), Some(id)) = (self.engine.take(), self.engine_id.take()) {
            let restored = engine.borrow_mut().destroy(&mut self.scheduler, id);
            for (key, value) in restored {
                log::debug!("restoring captured style {key:?} = {value:?}");
            }
        }
        self.entry = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            log::error!("failed to start: {err:#}");
            event_loop.exit();
            return;
        }
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.teardown(event_loop),

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = &mut self.entry {
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    if let Some(engine) = &self.engine {
                        let canvas = Vec2::new(new_size.width as f32, new_size.height as f32);
                        engine
                            .borrow_mut()
                            .update_size(canvas, Rect::new(0.0, 0.0, canvas.x, canvas.y));
                    }
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let position = to_physical(position);
                self.pointer = Some(position);
                self.disturb(position, 1.0, MOVE_STRENGTH);
            }

            WindowEvent::CursorLeft { .. } => {
                self.pointer = None;
            }

            WindowEvent::Touch(touch) => {
                let position = to_physical(touch.location);
                match touch.phase {
                    winit::event::TouchPhase::Started => {
                        self.disturb(position, CLICK_RADIUS_SCALE, CLICK_STRENGTH)
                    }
                    winit::event::TouchPhase::Moved => {
                        self.disturb(position, 1.0, MOVE_STRENGTH)
                    }
                    _ => {}
                }
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if let Some(position) = self.pointer {
                    self.disturb(position, CLICK_RADIUS_SCALE, CLICK_STRENGTH);
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Space) => {
                        if let Some(engine) = &self.engine {
                            let mut engine = engine.borrow_mut();
                            if engine.is_running() {
                                engine.pause();
                                log::info!("simulation paused");
                            } else {
                                engine.play();
                                log::info!("simulation resumed");
                            }
                        }
                        if let Some(entry) = &self.entry {
                            entry.with_window(|w| w.request_redraw());
                        }
                    }
                    PhysicalKey::Code(KeyCode::Escape) => self.teardown(event_loop),
                    _ => {}
                }
            }

            WindowEvent::RedrawRequested => self.redraw(),

            _ => {}
        }
    }
}

fn render_ctx<'a>(gpu: &'a Gpu<'_>) -> RenderCtx<'a> {
    let size = gpu.size();
    RenderCtx::new(
        gpu.device(),
        gpu.queue(),
        gpu.surface_format(),
        Viewport::new(size.width as f32, size.height as f32),
    )
}

fn to_physical(position: PhysicalPosition<f64>) -> Vec2 {
    Vec2::new(position.x as f32, position.y as f32)
}
