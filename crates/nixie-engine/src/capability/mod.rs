//! Texture-format capability negotiation for the height-field buffers.
//!
//! The simulation stores `(height, velocity)` in a float render target.
//! Negotiation picks the first candidate format the adapter can actually
//! render into — advertising a format is not enough, some platforms expose
//! float textures that fail as attachments. The result is an explicit
//! [`CapabilityConfig`] value injected into each engine; there is no hidden
//! global cache.

use crate::NixieError;

/// Immutable outcome of capability negotiation.
///
/// Created only by negotiation and shared by every engine on the same
/// device; the fields stay private so a config can only ever describe a
/// negotiated outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityConfig {
    format: wgpu::TextureFormat,
    linear_support: bool,
    zero_fill: bool,
    required_features: wgpu::Features,
}

impl CapabilityConfig {
    /// Height-field texture format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Whether the format supports linear filtering when sampled.
    ///
    /// When false the field buffers fall back to nearest filtering, which
    /// coarsens the composite's refraction lookup but keeps it correct.
    pub fn linear_support(&self) -> bool {
        self.linear_support
    }

    /// Whether the buffers get a host-side zero fill at allocation.
    ///
    /// The half-float path has no zero fill; its initial content is
    /// platform-default and treated as transient noise (see `field`).
    pub fn zero_fill(&self) -> bool {
        self.zero_fill
    }

    /// Device features that must be enabled for this config to work
    /// (e.g. filterable 32-bit floats).
    pub fn required_features(&self) -> wgpu::Features {
        self.required_features
    }

    /// Bytes per texel of the negotiated format.
    pub fn bytes_per_texel(&self) -> u32 {
        match self.format {
            wgpu::TextureFormat::Rgba32Float => 16,
            wgpu::TextureFormat::Rgba16Float => 8,
            other => {
                // Negotiation only ever emits the two formats above, and
                // negotiation is the only constructor.
                unreachable!("unexpected height-field format {other:?}")
            }
        }
    }

    /// Zeroed texel block for the initial buffer contents, when the
    /// negotiated path provides one.
    pub fn zero_data(&self, resolution: u32) -> Option<Vec<u8>> {
        if !self.zero_fill {
            return None;
        }
        let len = (resolution * resolution * self.bytes_per_texel()) as usize;
        Some(vec![0u8; len])
    }
}

/// What the platform reports about one candidate format.
#[derive(Debug, Copy, Clone)]
pub struct FormatProbe {
    pub format: wgpu::TextureFormat,
    /// Usable as a color attachment (the render-target completeness check).
    pub renderable: bool,
    /// Samplable with a linear-filtering sampler.
    pub filterable: bool,
}

/// Probes the adapter and negotiates a height-field configuration.
///
/// Candidate order is fixed: full float first (required present), then half
/// float. The first render-target-complete candidate wins.
pub fn negotiate(adapter: &wgpu::Adapter) -> Result<CapabilityConfig, NixieError> {
    let probes = [
        probe(adapter, wgpu::TextureFormat::Rgba32Float),
        probe(adapter, wgpu::TextureFormat::Rgba16Float),
    ];
    let config = negotiate_from_probes(&probes)?;
    log::info!(
        "negotiated height-field format {:?} (linear filtering: {})",
        config.format(),
        config.linear_support()
    );
    Ok(config)
}

/// Pure negotiation over a probed capability table.
pub fn negotiate_from_probes(probes: &[FormatProbe]) -> Result<CapabilityConfig, NixieError> {
    if probes.is_empty() {
        return Err(NixieError::UnsupportedPlatform);
    }

    for p in probes {
        if !p.renderable {
            continue;
        }
        let full_float = p.format == wgpu::TextureFormat::Rgba32Float;
        let mut required_features = wgpu::Features::empty();
        if full_float && p.filterable {
            required_features |= wgpu::Features::FLOAT32_FILTERABLE;
        }
        return Ok(CapabilityConfig {
            format: p.format,
            linear_support: p.filterable,
            zero_fill: full_float,
            required_features,
        });
    }

    Err(NixieError::NoRenderableFormat)
}

fn probe(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> FormatProbe {
    let features = adapter.get_texture_format_features(format);
    FormatProbe {
        format,
        renderable: features
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT),
        filterable: features
            .flags
            .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(format: wgpu::TextureFormat, renderable: bool, filterable: bool) -> FormatProbe {
        FormatProbe { format, renderable, filterable }
    }

    #[test]
    fn full_float_wins_when_renderable() {
        let probes = [
            p(wgpu::TextureFormat::Rgba32Float, true, true),
            p(wgpu::TextureFormat::Rgba16Float, true, true),
        ];
        let config = negotiate_from_probes(&probes).unwrap();
        assert_eq!(config.format(), wgpu::TextureFormat::Rgba32Float);
        assert!(config.linear_support());
        assert!(config.zero_fill());
        assert!(config.required_features().contains(wgpu::Features::FLOAT32_FILTERABLE));
    }

    #[test]
    fn half_float_fallback_when_full_float_not_renderable() {
        let probes = [
            p(wgpu::TextureFormat::Rgba32Float, false, false),
            p(wgpu::TextureFormat::Rgba16Float, true, true),
        ];
        let config = negotiate_from_probes(&probes).unwrap();
        assert_eq!(config.format(), wgpu::TextureFormat::Rgba16Float);
        assert!(config.linear_support());
        // Half-float path never zero-fills; initial content is platform noise.
        assert!(!config.zero_fill());
        assert_eq!(config.zero_data(64), None);
        assert!(config.required_features().is_empty());
    }

    #[test]
    fn linear_support_tracks_filterability_only() {
        // Baseline float rendering without filterable floats: linear off.
        let probes = [p(wgpu::TextureFormat::Rgba32Float, true, false)];
        let config = negotiate_from_probes(&probes).unwrap();
        assert!(!config.linear_support());
        assert!(config.required_features().is_empty());
    }

    #[test]
    fn texel_sizes_match_the_negotiated_format() {
        let full = negotiate_from_probes(&[p(wgpu::TextureFormat::Rgba32Float, true, true)]);
        assert_eq!(full.unwrap().bytes_per_texel(), 16);

        let half = negotiate_from_probes(&[
            p(wgpu::TextureFormat::Rgba32Float, false, false),
            p(wgpu::TextureFormat::Rgba16Float, true, false),
        ]);
        assert_eq!(half.unwrap().bytes_per_texel(), 8);
    }

    #[test]
    fn no_renderable_format_is_an_error() {
        let probes = [
            p(wgpu::TextureFormat::Rgba32Float, false, true),
            p(wgpu::TextureFormat::Rgba16Float, false, true),
        ];
        assert_eq!(
            negotiate_from_probes(&probes),
            Err(NixieError::NoRenderableFormat)
        );
    }

    #[test]
    fn empty_table_is_unsupported_platform() {
        assert_eq!(negotiate_from_probes(&[]), Err(NixieError::UnsupportedPlatform));
    }

    #[test]
    fn zero_data_covers_full_float_buffer() {
        let probes = [p(wgpu::TextureFormat::Rgba32Float, true, true)];
        let config = negotiate_from_probes(&probes).unwrap();
        let data = config.zero_data(64).unwrap();
        assert_eq!(data.len(), 64 * 64 * 16);
        assert!(data.iter().all(|&b| b == 0));
    }
}
