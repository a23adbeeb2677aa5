//! Batch rendering.
//!
//! Responsibilities:
//! - hold drawable geometry with depth/group/texture state ([`BatchGeometry`])
//! - stamp default state onto new geometry ([`GeometryFactory`])
//! - sort live geometry deterministically and draw it into the screen or a
//!   render target ([`BatchRenderer`])

mod factory;
mod geometry;
mod key;
mod renderer;
mod view;

pub use factory::{ApplyFlags, GeometryFactory};
pub use geometry::{BatchGeometry, BlendDrawState, DrawState, Primitive, Quad, Sprite, SpriteOptions};
pub use key::BatchKey;
pub use renderer::{BatchRenderer, BatchStats, GeometryId};
pub use view::View;
