//! Nixie engine crate.
//!
//! A GPU fluid-ripple decoration: a double-buffered height-field simulation
//! (disturb / diffuse passes) composited against a background texture, driven
//! once per display refresh by a frame scheduler.

pub mod device;
pub mod logging;
pub mod coords;
pub mod render;

pub mod capability;
pub mod program;
pub mod field;
pub mod geometry;
pub mod style;
pub mod background;
pub mod engine;
pub mod scheduler;
pub mod sim;

pub mod error;

pub use error::NixieError;
