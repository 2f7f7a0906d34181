//! The background texture sampled by the composite pass.

/// Holds the image the ripples refract.
///
/// Starts out as a small transparent placeholder so the composite pass can
/// draw before (or without) a decoded image. Replacing the image recreates
/// the texture, so callers must rebuild any bind group referencing it.
pub struct BackgroundTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: (u32, u32),
}

const PLACEHOLDER_SIDE: u32 = 32;

impl BackgroundTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let data = vec![0u8; (PLACEHOLDER_SIDE * PLACEHOLDER_SIDE * 4) as usize];
        Self::create(device, queue, PLACEHOLDER_SIDE, PLACEHOLDER_SIDE, &data)
    }

    /// Uploads a decoded RGBA image, replacing the current texture.
    pub fn set_image(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) {
        *self = Self::create(device, queue, width, height, rgba);
    }

    /// Drops back to the transparent placeholder.
    pub fn set_transparent(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        *self = Self::new(device, queue);
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Intrinsic size of the current image in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("nixie background"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Repeat wrapping only works for power-of-two dimensions on the
        // most constrained backends, matching the fallback below.
        let address_mode = if width.is_power_of_two() && height.is_power_of_two() {
            wgpu::AddressMode::Repeat
        } else {
            wgpu::AddressMode::ClampToEdge
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nixie background sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            size: (width, height),
        }
    }

    /// Releases the texture ahead of its last handle going away.
    pub fn release(&self) {
        self.texture.destroy();
    }
}
