//! Background sizing and texture-coordinate mapping.
//!
//! The composite pass draws the background texture as if it were a CSS
//! background layer behind the ripple surface: sizing (`cover`, `contain`,
//! explicit lengths) and positioning resolve to a pixel box, which then
//! becomes the texture window sampled for the surface.

use crate::coords::{Rect, Vec2};

/// One axis of an explicit background size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Dimension {
    /// Derived from the intrinsic image aspect ratio (or intrinsic size
    /// when both axes are auto).
    Auto,
    Px(f32),
    /// Relative to the surface box.
    Percent(f32),
}

impl Dimension {
    fn resolve(self, surface_extent: f32) -> Option<f32> {
        match self {
            Dimension::Auto => None,
            Dimension::Px(px) => Some(px),
            Dimension::Percent(pct) => Some(surface_extent * pct / 100.0),
        }
    }
}

/// How the background image is scaled to the surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BackgroundSize {
    /// Smallest size that fully covers the surface.
    Cover,
    /// Largest size fully contained in the surface.
    Contain,
    Explicit(Dimension, Dimension),
}

/// One axis of the background position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PositionCoord {
    Px(f32),
    /// Percent positioning distributes the leftover space, CSS-style:
    /// the offset is `(surface - background) * pct / 100`.
    Percent(f32),
}

impl PositionCoord {
    fn resolve(self, surface_extent: f32, background_extent: f32) -> f32 {
        match self {
            PositionCoord::Px(px) => px,
            PositionCoord::Percent(pct) => (surface_extent - background_extent) * pct / 100.0,
        }
    }
}

/// Where the background box anchors inside the surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BackgroundPosition {
    pub x: PositionCoord,
    pub y: PositionCoord,
}

impl BackgroundPosition {
    pub const CENTER: Self = Self::percent(50.0, 50.0);
    pub const TOP: Self = Self::percent(50.0, 0.0);
    pub const BOTTOM: Self = Self::percent(50.0, 100.0);
    pub const LEFT: Self = Self::percent(0.0, 50.0);
    pub const RIGHT: Self = Self::percent(100.0, 50.0);

    pub const fn percent(x: f32, y: f32) -> Self {
        Self {
            x: PositionCoord::Percent(x),
            y: PositionCoord::Percent(y),
        }
    }

    pub const fn px(x: f32, y: f32) -> Self {
        Self {
            x: PositionCoord::Px(x),
            y: PositionCoord::Px(y),
        }
    }
}

impl Default for BackgroundPosition {
    fn default() -> Self {
        Self::CENTER
    }
}

/// The resolved background layer style for one surface.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BackgroundStyle {
    pub size: BackgroundSize,
    pub position: BackgroundPosition,
}

impl Default for BackgroundStyle {
    fn default() -> Self {
        Self {
            size: BackgroundSize::Cover,
            position: BackgroundPosition::CENTER,
        }
    }
}

/// Per-frame uniforms for the composite vertex stage.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CoordinateMapping {
    /// Background texture coordinate at the surface's top-left corner.
    pub top_left: Vec2,
    /// Background texture coordinate at the surface's bottom-right corner.
    pub bottom_right: Vec2,
    /// Normalized canvas aspect, longest side mapped to 1.
    pub container_ratio: Vec2,
}

/// Scales the intrinsic image size to a background box in surface pixels.
pub fn resolve_background_size(size: BackgroundSize, surface: Vec2, intrinsic: Vec2) -> Vec2 {
    match size {
        BackgroundSize::Cover => {
            let scale = (surface.x / intrinsic.x).max(surface.y / intrinsic.y);
            intrinsic * scale
        }
        BackgroundSize::Contain => {
            let scale = (surface.x / intrinsic.x).min(surface.y / intrinsic.y);
            intrinsic * scale
        }
        BackgroundSize::Explicit(w, h) => {
            match (w.resolve(surface.x), h.resolve(surface.y)) {
                (Some(w), Some(h)) => Vec2::new(w, h),
                (Some(w), None) => Vec2::new(w, w * intrinsic.y / intrinsic.x),
                (None, Some(h)) => Vec2::new(h * intrinsic.x / intrinsic.y, h),
                (None, None) => intrinsic,
            }
        }
    }
}

/// Computes the composite-pass coordinate mapping for one frame.
///
/// `surface` is the ripple surface box in page pixels, `canvas` the render
/// target size in physical pixels and `intrinsic` the background image's
/// own size.
pub fn compute_mapping(
    surface: Rect,
    canvas: Vec2,
    style: BackgroundStyle,
    intrinsic: Vec2,
) -> CoordinateMapping {
    let background = resolve_background_size(style.size, surface.size, intrinsic);

    let background_x = surface.left() + style.position.x.resolve(surface.width(), background.x);
    let background_y = surface.top() + style.position.y.resolve(surface.height(), background.y);

    let top_left = Vec2::new(
        (surface.left() - background_x) / background.x,
        (surface.top() - background_y) / background.y,
    );
    let bottom_right = top_left
        + Vec2::new(
            surface.width() / background.x,
            surface.height() / background.y,
        );

    let max_side = canvas.max_side();
    let container_ratio = Vec2::new(canvas.x / max_side, canvas.y / max_side);

    CoordinateMapping {
        top_left,
        bottom_right,
        container_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn cover_fills_the_long_axis() {
        // Wide surface, square image: width drives the scale.
        let size = resolve_background_size(
            BackgroundSize::Cover,
            Vec2::new(800.0, 400.0),
            Vec2::new(100.0, 100.0),
        );
        assert!(close(size.x, 800.0) && close(size.y, 800.0));
    }

    #[test]
    fn contain_fits_the_short_axis() {
        let size = resolve_background_size(
            BackgroundSize::Contain,
            Vec2::new(800.0, 400.0),
            Vec2::new(100.0, 100.0),
        );
        assert!(close(size.x, 400.0) && close(size.y, 400.0));
    }

    #[test]
    fn explicit_auto_keeps_aspect_ratio() {
        let size = resolve_background_size(
            BackgroundSize::Explicit(Dimension::Px(200.0), Dimension::Auto),
            Vec2::new(800.0, 400.0),
            Vec2::new(100.0, 50.0),
        );
        assert!(close(size.x, 200.0) && close(size.y, 100.0));
    }

    #[test]
    fn explicit_percent_tracks_the_surface() {
        let size = resolve_background_size(
            BackgroundSize::Explicit(Dimension::Percent(50.0), Dimension::Percent(100.0)),
            Vec2::new(800.0, 400.0),
            Vec2::new(1.0, 1.0),
        );
        assert!(close(size.x, 400.0) && close(size.y, 400.0));
    }

    #[test]
    fn both_axes_auto_uses_intrinsic_size() {
        let size = resolve_background_size(
            BackgroundSize::Explicit(Dimension::Auto, Dimension::Auto),
            Vec2::new(800.0, 400.0),
            Vec2::new(123.0, 45.0),
        );
        assert!(close(size.x, 123.0) && close(size.y, 45.0));
    }

    #[test]
    fn mapping_spans_surface_over_background() {
        let mapping = compute_mapping(
            Rect::new(100.0, 50.0, 400.0, 200.0),
            Vec2::new(400.0, 200.0),
            BackgroundStyle::default(),
            Vec2::new(100.0, 100.0),
        );

        // The coordinate window width equals surface / background width.
        assert!(close(mapping.bottom_right.x - mapping.top_left.x, 400.0 / 400.0));
        assert!(close(mapping.bottom_right.y - mapping.top_left.y, 200.0 / 400.0));
    }

    #[test]
    fn centered_cover_window_is_symmetric() {
        // Square image covering a wide surface: excess height splits evenly.
        let mapping = compute_mapping(
            Rect::new(0.0, 0.0, 400.0, 200.0),
            Vec2::new(400.0, 200.0),
            BackgroundStyle::default(),
            Vec2::new(100.0, 100.0),
        );
        assert!(close(mapping.top_left.x, 0.0));
        assert!(close(mapping.top_left.y, 0.25));
        assert!(close(mapping.bottom_right.y, 0.75));
    }

    #[test]
    fn container_ratio_normalizes_the_longest_side() {
        let mapping = compute_mapping(
            Rect::new(0.0, 0.0, 300.0, 150.0),
            Vec2::new(600.0, 300.0),
            BackgroundStyle::default(),
            Vec2::new(100.0, 100.0),
        );
        assert!(close(mapping.container_ratio.x, 1.0));
        assert!(close(mapping.container_ratio.y, 0.5));
    }

    #[test]
    fn pixel_position_offsets_the_window() {
        let style = BackgroundStyle {
            size: BackgroundSize::Explicit(Dimension::Px(100.0), Dimension::Px(100.0)),
            position: BackgroundPosition::px(25.0, 0.0),
        };
        let mapping = compute_mapping(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Vec2::new(100.0, 100.0),
            style,
            Vec2::new(100.0, 100.0),
        );
        assert!(close(mapping.top_left.x, -0.25));
    }

    #[test]
    fn keyword_positions() {
        assert_eq!(BackgroundPosition::TOP, BackgroundPosition::percent(50.0, 0.0));
        assert_eq!(BackgroundPosition::BOTTOM, BackgroundPosition::percent(50.0, 100.0));
        assert_eq!(BackgroundPosition::LEFT, BackgroundPosition::percent(0.0, 50.0));
        assert_eq!(BackgroundPosition::RIGHT, BackgroundPosition::percent(100.0, 50.0));
        assert_eq!(BackgroundPosition::default(), BackgroundPosition::CENTER);
    }
}
