//! Shared GPU-backed resources.
//!
//! [`Texture`] and [`RenderTarget`] are handed out as `Arc`s. The
//! [`ResourceManager`] keeps the authoritative list and releases native handles
//! once nothing outside it refers to a resource.

mod decode;
mod manager;
mod render_target;
mod texture;

pub use decode::{DecodedImage, ImageCrateDecoder, ImageDecoder};
pub use manager::{Resource, ResourceKind, ResourceManager};
pub use render_target::RenderTarget;
pub use texture::{PixelLock, Texture, FAILED_TEXTURE_NAME};
