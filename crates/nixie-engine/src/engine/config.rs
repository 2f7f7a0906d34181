//! Engine construction options.

/// Options accepted when creating a [`super::RippleEngine`].
pub struct RipplesConfig {
    /// Side length of the square height-field textures, in texels.
    pub resolution: u32,
    /// Default disturbance radius in surface pixels.
    pub drop_radius: f32,
    /// Refraction strength applied by the composite pass.
    pub perturbance: f32,
    /// Whether pointer input should raise disturbances.
    pub interactive: bool,
    /// Optional image to load as the background instead of the captured one.
    pub image_url: Option<String>,
    /// Cross-origin policy forwarded to the image loader.
    pub cross_origin: String,
    /// Invoked once the engine is fully constructed.
    pub on_initialized: Option<Box<dyn FnOnce()>>,
}

impl Default for RipplesConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            drop_radius: 20.0,
            perturbance: 0.03,
            interactive: true,
            image_url: None,
            cross_origin: String::new(),
            on_initialized: None,
        }
    }
}

impl std::fmt::Debug for RipplesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RipplesConfig")
            .field("resolution", &self.resolution)
            .field("drop_radius", &self.drop_radius)
            .field("perturbance", &self.perturbance)
            .field("interactive", &self.interactive)
            .field("image_url", &self.image_url)
            .field("cross_origin", &self.cross_origin)
            .field("on_initialized", &self.on_initialized.is_some())
            .finish()
    }
}
