//! The ripple engine: disturb, diffuse, composite.
//!
//! One engine owns a double-buffered height field, the three programs that
//! operate on it and the background texture the composite pass refracts.
//! Frame order is fixed: optional disturbances land first (each in its own
//! submission), then one diffusion step when running, then the composite
//! draw into the caller's render target.

pub mod config;
pub mod flags;

pub use config::RipplesConfig;
pub use flags::{EngineFlags, FramePlan};

use crate::NixieError;
use crate::background::BackgroundTexture;
use crate::capability::CapabilityConfig;
use crate::coords::{Rect, Vec2};
use crate::field::PingPong;
use crate::geometry::{self, BackgroundStyle, CoordinateMapping};
use crate::program::{
    COMPOSITE_FS, COMPOSITE_VS, DIFFUSE_FS, DISTURB_FS, Program, ProgramCompiler, ProgramDesc,
    QUAD_VS, TextureBinding, create_quad_buffer,
};
use crate::render::{RenderCtx, RenderTarget};
use crate::scheduler::{FrameScheduler, SchedulerId};
use crate::style::{StyleCache, StyleKey, StyleValue};

/// Disturbance parameters for one pointer event, in surface pixels.
#[derive(Debug, Copy, Clone)]
pub struct Drop {
    pub position: Vec2,
    pub radius: f32,
    pub strength: f32,
}

pub struct RippleEngine {
    flags: EngineFlags,
    interactive: bool,
    drop_radius: f32,
    perturbance: f32,

    field: PingPong,
    disturb: Program,
    diffuse: Program,
    composite: Program,
    background: BackgroundTexture,
    styles: StyleCache,
    quad: wgpu::Buffer,

    // Bind groups indexed by the field buffer being read.
    disturb_binds: [wgpu::BindGroup; 2],
    diffuse_binds: [wgpu::BindGroup; 2],
    composite_binds: [wgpu::BindGroup; 2],

    /// The decorated surface's box in page pixels.
    surface_box: Rect,
    /// Render target size in physical pixels.
    canvas: Vec2,
    background_style: BackgroundStyle,
}

impl RippleEngine {
    pub fn new(
        ctx: &RenderCtx<'_>,
        capabilities: &CapabilityConfig,
        mut config: RipplesConfig,
    ) -> Result<Self, NixieError> {
        let field = PingPong::allocate(ctx.device, ctx.queue, config.resolution, capabilities);

        let field_texture = TextureBinding {
            filterable: capabilities.linear_support(),
        };
        let disturb = ProgramCompiler::compile(
            ctx.device,
            &ProgramDesc {
                label: "nixie disturb",
                vertex_src: QUAD_VS,
                fragment_src: DISTURB_FS,
                textures: &[field_texture],
                target_format: capabilities.format(),
                blend: None,
            },
        )?;
        let mut diffuse = ProgramCompiler::compile(
            ctx.device,
            &ProgramDesc {
                label: "nixie diffuse",
                vertex_src: QUAD_VS,
                fragment_src: DIFFUSE_FS,
                textures: &[field_texture],
                target_format: capabilities.format(),
                blend: None,
            },
        )?;
        let mut composite = ProgramCompiler::compile(
            ctx.device,
            &ProgramDesc {
                label: "nixie composite",
                vertex_src: COMPOSITE_VS,
                fragment_src: COMPOSITE_FS,
                textures: &[TextureBinding { filterable: true }, field_texture],
                target_format: ctx.surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            },
        )?;

        // The texel step never changes after allocation; set it once and let
        // the per-draw flush keep re-applying it.
        let delta = 1.0 / config.resolution as f32;
        diffuse.set_vec2("delta", [delta, delta]);
        composite.set_vec2("delta", [delta, delta]);

        let background = BackgroundTexture::new(ctx.device, ctx.queue);
        let quad = create_quad_buffer(ctx.device);

        let mut styles = StyleCache::new();
        let (bg_w, bg_h) = background.size();
        styles.set_number(StyleKey::BackgroundWidth, bg_w as f32);
        styles.set_number(StyleKey::BackgroundHeight, bg_h as f32);

        let disturb_binds = Self::field_binds(ctx.device, &disturb, &field);
        let diffuse_binds = Self::field_binds(ctx.device, &diffuse, &field);
        let composite_binds = Self::composite_binds(ctx.device, &composite, &background, &field);

        let canvas = Vec2::new(ctx.viewport.width, ctx.viewport.height);

        let engine = Self {
            flags: EngineFlags::new(),
            interactive: config.interactive,
            drop_radius: config.drop_radius,
            perturbance: config.perturbance,
            field,
            disturb,
            diffuse,
            composite,
            background,
            styles,
            quad,
            disturb_binds,
            diffuse_binds,
            composite_binds,
            surface_box: Rect::new(0.0, 0.0, canvas.x, canvas.y),
            canvas,
            background_style: BackgroundStyle::default(),
        };

        if let Some(callback) = config.on_initialized.take() {
            callback();
        }
        log::debug!(
            "ripple engine ready: resolution {}, format {:?}",
            engine.field.resolution(),
            capabilities.format()
        );
        Ok(engine)
    }

    // ── pointer input ─────────────────────────────────────────────────────

    pub fn pointer_enabled(&self) -> bool {
        self.flags.pointer_enabled(self.interactive)
    }

    /// Default radius for pointer-raised drops, in surface pixels.
    pub fn drop_radius(&self) -> f32 {
        self.drop_radius
    }

    /// Raises a disturbance at a surface-pixel position.
    ///
    /// Each drop is its own submission so several can land between frames,
    /// each reading the previous one's output.
    pub fn drop_at(&mut self, ctx: &RenderCtx<'_>, drop: Drop) -> Result<(), NixieError> {
        self.flags.ensure_alive()?;
        if self.surface_box.is_empty() {
            return Ok(());
        }

        // Normalize against the longest side so drops stay round on
        // non-square surfaces. The center is in y-up device coordinates.
        let longest = self.surface_box.size.max_side();
        let center = Vec2::new(
            (2.0 * drop.position.x - self.surface_box.width()) / longest,
            (self.surface_box.height() - 2.0 * drop.position.y) / longest,
        );

        self.disturb.set_vec2("center", [center.x, center.y]);
        self.disturb.set_f32("radius", drop.radius / longest);
        self.disturb.set_f32("strength", drop.strength);
        self.disturb.flush(ctx.queue);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nixie disturb encoder"),
            });
        self.field_pass(&mut encoder, "nixie disturb pass", Pass::Disturb);
        ctx.queue.submit(Some(encoder.finish()));
        self.field.swap();
        Ok(())
    }

    // ── frame ─────────────────────────────────────────────────────────────

    /// Renders one frame: a simulation step when running, then the
    /// composite draw. Hidden engines do nothing.
    pub fn step(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
    ) -> Result<(), NixieError> {
        self.flags.ensure_alive()?;
        let plan = FramePlan::for_state(&self.flags, self.surface_box.is_empty());
        if !plan.composite {
            return Ok(());
        }

        let mapping = self.mapping();

        if plan.diffuse {
            self.diffuse.flush(ctx.queue);
            self.field_pass(target.encoder, "nixie diffuse pass", Pass::Diffuse);
            self.field.swap();
        }

        self.composite_pass(ctx, target, mapping);
        Ok(())
    }

    fn mapping(&self) -> CoordinateMapping {
        let intrinsic = Vec2::new(
            self.styles
                .get_number(StyleKey::BackgroundWidth)
                .unwrap_or(1.0),
            self.styles
                .get_number(StyleKey::BackgroundHeight)
                .unwrap_or(1.0),
        );
        geometry::compute_mapping(self.surface_box, self.canvas, self.background_style, intrinsic)
    }

    fn field_pass(&self, encoder: &mut wgpu::CommandEncoder, label: &str, pass: Pass) {
        let (program, binds) = match pass {
            Pass::Disturb => (&self.disturb, &self.disturb_binds),
            Pass::Diffuse => (&self.diffuse, &self.diffuse_binds),
        };
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.field.write().view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(program.pipeline());
        rpass.set_bind_group(0, &binds[self.field.read_index()], &[]);
        rpass.set_vertex_buffer(0, self.quad.slice(..));
        rpass.draw(0..4, 0..1);
    }

    fn composite_pass(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut RenderTarget<'_>,
        mapping: CoordinateMapping,
    ) {
        self.composite
            .set_vec2("top_left", [mapping.top_left.x, mapping.top_left.y]);
        self.composite
            .set_vec2("bottom_right", [mapping.bottom_right.x, mapping.bottom_right.y]);
        self.composite.set_vec2(
            "container_ratio",
            [mapping.container_ratio.x, mapping.container_ratio.y],
        );
        self.composite.set_f32("perturbance", self.perturbance);
        self.composite.flush(ctx.queue);

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("nixie composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        rpass.set_pipeline(self.composite.pipeline());
        rpass.set_bind_group(0, &self.composite_binds[self.field.read_index()], &[]);
        rpass.set_vertex_buffer(0, self.quad.slice(..));
        rpass.draw(0..4, 0..1);
    }

    // ── background ────────────────────────────────────────────────────────

    /// Replaces the background with a decoded RGBA image.
    pub fn set_background_image(
        &mut self,
        ctx: &RenderCtx<'_>,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<(), NixieError> {
        self.flags.ensure_alive()?;
        self.background
            .set_image(ctx.device, ctx.queue, width, height, rgba);
        self.styles
            .set_number(StyleKey::BackgroundWidth, width as f32);
        self.styles
            .set_number(StyleKey::BackgroundHeight, height as f32);
        self.composite_binds =
            Self::composite_binds(ctx.device, &self.composite, &self.background, &self.field);
        Ok(())
    }

    /// Drops back to the transparent placeholder background.
    pub fn set_background_transparent(&mut self, ctx: &RenderCtx<'_>) -> Result<(), NixieError> {
        self.flags.ensure_alive()?;
        self.background.set_transparent(ctx.device, ctx.queue);
        let (w, h) = self.background.size();
        self.styles.set_number(StyleKey::BackgroundWidth, w as f32);
        self.styles.set_number(StyleKey::BackgroundHeight, h as f32);
        self.composite_binds =
            Self::composite_binds(ctx.device, &self.composite, &self.background, &self.field);
        Ok(())
    }

    pub fn set_background_style(&mut self, style: BackgroundStyle) {
        self.background_style = style;
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    pub fn pause(&mut self) {
        self.flags.running = false;
    }

    pub fn play(&mut self) {
        self.flags.running = true;
    }

    pub fn hide(&mut self) {
        self.flags.visible = false;
    }

    pub fn show(&mut self) {
        self.flags.visible = true;
    }

    pub fn is_running(&self) -> bool {
        self.flags.running
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.destroyed
    }

    pub fn set_perturbance(&mut self, perturbance: f32) {
        self.perturbance = perturbance;
    }

    pub fn set_drop_radius(&mut self, radius: f32) {
        self.drop_radius = radius;
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    /// Tracks a resize of the render target and the decorated surface.
    pub fn update_size(&mut self, canvas: Vec2, surface: Rect) {
        if !canvas.is_finite() || !surface.is_finite() {
            log::warn!("ignoring non-finite resize");
            return;
        }
        self.canvas = canvas;
        self.surface_box = surface;
    }

    /// Records a piece of the surface's pre-takeover presentation.
    ///
    /// The first capture of a key wins; `destroy` hands every captured
    /// value back so the host can restore it.
    pub fn capture_style(&mut self, key: StyleKey, value: StyleValue) -> Result<(), NixieError> {
        self.flags.ensure_alive()?;
        self.styles.capture(key, value);
        Ok(())
    }

    /// Tears the engine down: deregisters it from the scheduler, releases
    /// the field and background textures, and returns the captured
    /// presentation so the host can restore it. Afterwards every operation
    /// returns [`NixieError::Destroyed`]. Idempotent; later calls return
    /// nothing.
    pub fn destroy(
        &mut self,
        scheduler: &mut FrameScheduler,
        id: SchedulerId,
    ) -> Vec<(StyleKey, StyleValue)> {
        if self.flags.destroyed {
            return Vec::new();
        }
        // Deregister before touching GPU resources so no frame can observe
        // the engine mid-teardown.
        scheduler.unregister(id);
        self.flags.destroyed = true;
        self.field.release();
        self.background.release();

        // Intrinsic sizes are derived state, not captured presentation.
        self.styles.evict(StyleKey::BackgroundWidth);
        self.styles.evict(StyleKey::BackgroundHeight);
        let mut restored = Vec::new();
        self.styles.restore_into(|key, value| restored.push((key, value)));
        log::debug!("ripple engine destroyed");
        restored
    }

    // ── bind group construction ───────────────────────────────────────────

    fn field_binds(
        device: &wgpu::Device,
        program: &Program,
        field: &PingPong,
    ) -> [wgpu::BindGroup; 2] {
        [0, 1].map(|read| {
            program.create_bind_group(
                device,
                &[(&field.target(read).view, field.sampler())],
            )
        })
    }

    fn composite_binds(
        device: &wgpu::Device,
        program: &Program,
        background: &BackgroundTexture,
        field: &PingPong,
    ) -> [wgpu::BindGroup; 2] {
        [0, 1].map(|read| {
            program.create_bind_group(
                device,
                &[
                    (background.view(), background.sampler()),
                    (&field.target(read).view, field.sampler()),
                ],
            )
        })
    }
}

enum Pass {
    Disturb,
    Diffuse,
}
