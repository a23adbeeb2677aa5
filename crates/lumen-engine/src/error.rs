//! Engine error types.
//!
//! Resource creation never returns these: failed loads produce placeholder
//! resources instead. They cover programmer errors (double initialization),
//! local pixel-access misuse and backend failures.

use std::fmt;

use crate::gfx::{FramebufferId, TextureId};

/// Errors surfaced by the render system boundary.
#[derive(Debug)]
pub enum EngineError {
    /// `RenderSystem::initialize` was called while another system is alive.
    AlreadyInitialized,
    /// The window collaborator failed to open.
    Window(anyhow::Error),
    /// The graphics backend failed to come up.
    Graphics(anyhow::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::AlreadyInitialized => write!(f, "render system is already initialized"),
            EngineError::Window(e) => write!(f, "window initialization failed: {e:#}"),
            EngineError::Graphics(e) => write!(f, "graphics initialization failed: {e:#}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Invalid texture pixel access.
///
/// Reported locally; never affects other textures.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PixelError {
    /// Pixel access outside a `lock()` / `unlock()` scope.
    NotLocked,
    /// Coordinate outside the texture.
    OutOfBounds { x: u32, y: u32, width: u32, height: u32 },
}

impl fmt::Display for PixelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelError::NotLocked => write!(f, "texture pixels accessed while unlocked"),
            PixelError::OutOfBounds { x, y, width, height } => {
                write!(f, "pixel ({x}, {y}) is outside the {width}x{height} texture")
            }
        }
    }
}

impl std::error::Error for PixelError {}

/// Failure reported by a [`crate::gfx::GraphicsApi`] implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum GfxError {
    UnknownTexture(TextureId),
    UnknownFramebuffer(FramebufferId),
    /// Pixel data does not match the texture extent.
    SizeMismatch { expected: usize, actual: usize },
    /// Zero-sized or over-limit texture.
    InvalidExtent { width: u32, height: u32 },
    /// Backend-specific failure (readback mapping, device loss, ...).
    Backend(String),
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfxError::UnknownTexture(id) => write!(f, "unknown texture {}", id.0),
            GfxError::UnknownFramebuffer(id) => write!(f, "unknown framebuffer {}", id.0),
            GfxError::SizeMismatch { expected, actual } => {
                write!(f, "pixel data is {actual} bytes, expected {expected}")
            }
            GfxError::InvalidExtent { width, height } => {
                write!(f, "invalid texture extent {width}x{height}")
            }
            GfxError::Backend(msg) => write!(f, "graphics backend error: {msg}"),
        }
    }
}

impl std::error::Error for GfxError {}
