//! Lumen engine crate.
//!
//! A 2D batch renderer over an immediate-mode graphics API: shared textures
//! and render targets with reference-counted lifetimes, depth/group/texture
//! sorted geometry batches, and a frame loop that ties them to a window.

pub mod batch;
pub mod coords;
pub mod device;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod paint;
pub mod resource;
pub mod scene;
pub mod system;
pub mod text;
pub mod time;
pub mod window;

pub use error::{EngineError, GfxError, PixelError};
pub use system::{RenderSystem, SystemConfig};
