//! Double-buffered height-field storage.
//!
//! The simulation reads the previous frame from one texture while writing
//! the next frame into the other, then swaps the roles. Both textures are
//! allocated once and reused for the lifetime of the engine.

use crate::capability::CapabilityConfig;

/// Which of the two buffers is currently read from.
///
/// The roles always stay complementary: `write == 1 - read`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferIndex {
    read: usize,
}

impl BufferIndex {
    /// The first simulated frame reads buffer 1 and writes buffer 0.
    pub fn new() -> Self {
        Self { read: 1 }
    }

    pub fn read(&self) -> usize {
        self.read
    }

    pub fn write(&self) -> usize {
        1 - self.read
    }

    /// Exchanges the read and write roles.
    pub fn swap(&mut self) {
        self.read ^= 1;
    }
}

impl Default for BufferIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// One of the two float render targets.
pub struct FieldTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// The pair of height-field textures plus the shared sampler.
pub struct PingPong {
    targets: [FieldTarget; 2],
    index: BufferIndex,
    sampler: wgpu::Sampler,
    resolution: u32,
}

impl PingPong {
    /// Allocates both targets at the negotiated format.
    ///
    /// Targets are square, `resolution` texels per side, and zero-filled
    /// when the capability path provides initial data.
    pub fn allocate(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        resolution: u32,
        config: &CapabilityConfig,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: resolution,
            height: resolution,
            depth_or_array_layers: 1,
        };

        let targets = [0, 1].map(|i| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(if i == 0 { "nixie field 0" } else { "nixie field 1" }),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: config.format(),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });

            if let Some(data) = config.zero_data(resolution) {
                queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    &data,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(resolution * config.bytes_per_texel()),
                        rows_per_image: Some(resolution),
                    },
                    size,
                );
            }

            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            FieldTarget { texture, view }
        });

        let filter = if config.linear_support() {
            wgpu::FilterMode::Linear
        } else {
            wgpu::FilterMode::Nearest
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nixie field sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        Self {
            targets,
            index: BufferIndex::new(),
            sampler,
            resolution,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// The target holding the previous frame.
    pub fn read(&self) -> &FieldTarget {
        &self.targets[self.index.read()]
    }

    /// The target the next pass renders into.
    pub fn write(&self) -> &FieldTarget {
        &self.targets[self.index.write()]
    }

    pub fn read_index(&self) -> usize {
        self.index.read()
    }

    /// Target by absolute buffer index, for bind groups built per role.
    pub fn target(&self, index: usize) -> &FieldTarget {
        &self.targets[index]
    }

    pub fn swap(&mut self) {
        self.index.swap();
    }

    /// Destroys both textures ahead of their last handles going away.
    pub fn release(&self) {
        for target in &self.targets {
            target.texture.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_roles() {
        let index = BufferIndex::new();
        assert_eq!(index.read(), 1);
        assert_eq!(index.write(), 0);
    }

    #[test]
    fn roles_stay_complementary() {
        let mut index = BufferIndex::new();
        for _ in 0..7 {
            assert_eq!(index.read() + index.write(), 1);
            index.swap();
        }
    }

    #[test]
    fn swap_is_an_involution() {
        let mut index = BufferIndex::new();
        let before = index;
        index.swap();
        assert_ne!(index, before);
        index.swap();
        assert_eq!(index, before);
    }
}
