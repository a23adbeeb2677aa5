//! Coordinate and geometry types shared by the batch renderer and the GPU backends.
//!
//! Canonical CPU space:
//! - Logical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Backends map logical space onto the bound target through a [`crate::gfx::Projection`].

mod extent;
mod rect;
mod vec2;

pub use extent::Extent;
pub use rect::Rect;
pub use vec2::Vec2;
