//! Renderer-facing context types.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
