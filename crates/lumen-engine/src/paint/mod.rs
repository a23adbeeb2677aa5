//! Paint model shared between geometry, textures and the GPU backends.
//!
//! Colors are straight-alpha RGBA8, which is also the texel format of every
//! texture the engine creates. Backends blend with `src_alpha / one_minus_src_alpha`.

pub mod color;

pub use color::Color;
