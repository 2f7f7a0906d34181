//! Coordinate primitives shared by the simulation and the geometry mapper.

mod rect;
mod vec2;
mod viewport;

pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
