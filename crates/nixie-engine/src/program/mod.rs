//! Shader program compilation and uniform handling.
//!
//! A [`Program`] is one fixed-function-free raster pass: a render pipeline
//! over the shared full-screen quad, one uniform buffer addressed by name
//! (reflected from the WGSL source, see [`reflect`]), and a staged value
//! block that is re-applied to the GPU explicitly before every draw.

mod reflect;

use bytemuck::{Pod, Zeroable};

use crate::NixieError;
use crate::error::ShaderStage;

pub use reflect::{UniformLayout, UniformSlot, reflect_uniforms};

/// Shared vertex source for the offscreen simulation passes.
pub const QUAD_VS: &str = include_str!("shaders/quad.vs.wgsl");
/// Disturbance injection fragment source.
pub const DISTURB_FS: &str = include_str!("shaders/disturb.fs.wgsl");
/// Diffusion/decay integration fragment source.
pub const DIFFUSE_FS: &str = include_str!("shaders/diffuse.fs.wgsl");
/// Composite vertex source (coordinate mapping).
pub const COMPOSITE_VS: &str = include_str!("shaders/composite.vs.wgsl");
/// Composite fragment source (refraction + specular).
pub const COMPOSITE_FS: &str = include_str!("shaders/composite.fs.wgsl");

// ── full-screen quad ──────────────────────────────────────────────────────

/// The single vertex attribute every program consumes: position, 2 components.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
}

/// Triangle-strip quad covering the whole target.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, -1.0] },
    QuadVertex { position: [-1.0, 1.0] },
    QuadVertex { position: [1.0, 1.0] },
];

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Creates the shared quad vertex buffer.
pub fn create_quad_buffer(device: &wgpu::Device) -> wgpu::Buffer {
    use wgpu::util::DeviceExt;
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("nixie quad vbo"),
        contents: bytemuck::cast_slice(&QUAD_VERTICES),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

// ── uniform staging ───────────────────────────────────────────────────────

/// CPU-side uniform value block.
///
/// Values set by name persist here across frames and the whole block is
/// uploaded before each draw, so a value set once (e.g. `delta` at link
/// time) keeps reaching later draw calls without implicit driver caching.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: UniformLayout,
    staged: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let staged = vec![0u8; layout.size() as usize];
        Self { layout, staged }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.staged
    }

    pub fn set_f32(&mut self, name: &str, value: f32) {
        self.stage(name, bytemuck::bytes_of(&value));
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.stage(name, bytemuck::bytes_of(&value));
    }

    /// Last-set bytes for a uniform, if it exists.
    pub fn value_of(&self, name: &str) -> Option<&[u8]> {
        let slot = self.layout.get(name)?;
        let start = slot.offset as usize;
        Some(&self.staged[start..start + slot.size as usize])
    }

    fn stage(&mut self, name: &str, bytes: &[u8]) {
        let Some(slot) = self.layout.get(name) else {
            // Tolerated, as unused uniforms get pruned from shaders over time.
            log::debug!("uniform `{name}` is not declared; value ignored");
            return;
        };
        if slot.size as usize != bytes.len() {
            log::warn!(
                "uniform `{name}` expects {} bytes, got {}; value ignored",
                slot.size,
                bytes.len()
            );
            return;
        }
        let start = slot.offset as usize;
        self.staged[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

// ── program ───────────────────────────────────────────────────────────────

/// Describes one texture binding of a program (bound as view + sampler).
#[derive(Debug, Copy, Clone)]
pub struct TextureBinding {
    /// Whether the bound texture may be sampled with a filtering sampler.
    /// Float height-field textures are only filterable when the negotiated
    /// capability says so.
    pub filterable: bool,
}

/// Everything needed to compile one pass.
pub struct ProgramDesc<'a> {
    pub label: &'static str,
    pub vertex_src: &'a str,
    pub fragment_src: &'a str,
    pub textures: &'a [TextureBinding],
    pub target_format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
}

/// A compiled raster pass.
///
/// The locations map (inside [`UniformBlock`]) is immutable after
/// construction; only the staged values mutate per frame.
pub struct Program {
    label: &'static str,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    pub uniforms: UniformBlock,
}

impl Program {
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn set_f32(&mut self, name: &str, value: f32) {
        self.uniforms.set_f32(name, value);
    }

    pub fn set_vec2(&mut self, name: &str, value: [f32; 2]) {
        self.uniforms.set_vec2(name, value);
    }

    /// Uploads the staged uniform block.
    ///
    /// Called before every draw that uses this program; re-applying the
    /// whole block keeps values set in earlier frames in effect.
    pub fn flush(&self, queue: &wgpu::Queue) {
        queue.write_buffer(&self.uniform_buffer, 0, self.uniforms.bytes());
    }

    /// Builds a bind group pairing this program's uniform buffer with the
    /// given texture units, in binding order.
    pub fn create_bind_group(
        &self,
        device: &wgpu::Device,
        units: &[(&wgpu::TextureView, &wgpu::Sampler)],
    ) -> wgpu::BindGroup {
        let mut entries = Vec::with_capacity(1 + units.len() * 2);
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: self.uniform_buffer.as_entire_binding(),
        });
        for (i, (view, sampler)) in units.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: (1 + i * 2) as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: (2 + i * 2) as u32,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(self.label),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }
}

// ── compiler ──────────────────────────────────────────────────────────────

/// Compiles and links the three ripple passes (or any other quad pass).
pub struct ProgramCompiler;

impl ProgramCompiler {
    pub fn compile(device: &wgpu::Device, desc: &ProgramDesc<'_>) -> Result<Program, NixieError> {
        let vertex = Self::compile_stage(device, ShaderStage::Vertex, desc.vertex_src)?;
        let fragment = Self::compile_stage(device, ShaderStage::Fragment, desc.fragment_src)?;

        // Uniforms are reflected over the concatenation of both stages;
        // the shared struct makes re-declared names idempotent.
        let concatenated = format!("{}\n{}", desc.vertex_src, desc.fragment_src);
        let layout = reflect_uniforms(&concatenated);
        let uniforms = UniformBlock::new(layout);

        let bind_group_layout = Self::create_bind_group_layout(device, desc, uniforms.layout());

        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.label),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.target_format,
                    blend: desc.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(error_scope.pop()) {
            return Err(NixieError::ProgramLink { log: err.to_string() });
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: uniforms.layout().size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Program {
            label: desc.label,
            pipeline,
            bind_group_layout,
            uniform_buffer,
            uniforms,
        })
    }

    fn compile_stage(
        device: &wgpu::Device,
        stage: ShaderStage,
        source: &str,
    ) -> Result<wgpu::ShaderModule, NixieError> {
        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: None,
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        match pollster::block_on(error_scope.pop()) {
            Some(err) => Err(NixieError::ShaderCompile {
                stage,
                log: err.to_string(),
            }),
            None => Ok(module),
        }
    }

    fn create_bind_group_layout(
        device: &wgpu::Device,
        desc: &ProgramDesc<'_>,
        layout: &UniformLayout,
    ) -> wgpu::BindGroupLayout {
        let mut entries = Vec::with_capacity(1 + desc.textures.len() * 2);

        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: std::num::NonZeroU64::new(layout.size() as u64),
            },
            count: None,
        });

        for (i, texture) in desc.textures.iter().enumerate() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: (1 + i * 2) as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float {
                        filterable: texture.filterable,
                    },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: (2 + i * 2) as u32,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(if texture.filterable {
                    wgpu::SamplerBindingType::Filtering
                } else {
                    wgpu::SamplerBindingType::NonFiltering
                }),
                count: None,
            });
        }

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(desc.label),
            entries: &entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> UniformBlock {
        UniformBlock::new(reflect_uniforms(DISTURB_FS))
    }

    #[test]
    fn shader_sources_declare_their_uniforms() {
        let disturb = reflect_uniforms(DISTURB_FS);
        assert!(disturb.get("center").is_some());
        assert!(disturb.get("radius").is_some());
        assert!(disturb.get("strength").is_some());

        let diffuse = reflect_uniforms(DIFFUSE_FS);
        assert!(diffuse.get("delta").is_some());

        let composite =
            reflect_uniforms(&format!("{COMPOSITE_VS}\n{COMPOSITE_FS}"));
        for name in ["top_left", "bottom_right", "container_ratio", "delta", "perturbance"] {
            assert!(composite.get(name).is_some(), "missing uniform {name}");
        }
    }

    #[test]
    fn staged_values_persist_until_overwritten() {
        let mut block = block();
        block.set_vec2("center", [0.25, -0.5]);
        block.set_f32("radius", 0.1);

        assert_eq!(
            block.value_of("center").unwrap(),
            bytemuck::bytes_of(&[0.25f32, -0.5])
        );

        // A later frame overwrites only what it sets.
        block.set_f32("radius", 0.2);
        assert_eq!(block.value_of("radius").unwrap(), bytemuck::bytes_of(&0.2f32));
        assert_eq!(
            block.value_of("center").unwrap(),
            bytemuck::bytes_of(&[0.25f32, -0.5])
        );
    }

    #[test]
    fn unknown_uniform_is_ignored() {
        let mut block = block();
        let before = block.bytes().to_vec();
        block.set_f32("no_such_uniform", 1.0);
        assert_eq!(block.bytes(), &before[..]);
    }

    #[test]
    fn size_mismatch_is_ignored() {
        let mut block = block();
        let before = block.bytes().to_vec();
        // `radius` is a scalar; a vec2 write must not land.
        block.set_vec2("radius", [1.0, 2.0]);
        assert_eq!(block.bytes(), &before[..]);
    }

    #[test]
    fn block_bytes_cover_padded_layout() {
        let block = block();
        assert_eq!(block.bytes().len(), 16);
    }
}
