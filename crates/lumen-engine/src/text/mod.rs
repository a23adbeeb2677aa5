//! Text rendering through a baked glyph atlas.

mod font;

pub use font::{BitmapFont, FontLoadError, DEFAULT_FONT};
