//! Immediate-mode graphics API.
//!
//! Everything above this module (textures, render targets, the batch renderer)
//! talks to the GPU through [`GraphicsApi`]: create/upload/read/delete textures,
//! create framebuffers over textures, and record passes of bound-texture
//! triangle draws against either the screen or a framebuffer.
//!
//! Two implementations ship with the engine:
//! - [`WgpuApi`]: renders through wgpu onto a window surface and offscreen textures.
//! - [`SoftwareApi`]: CPU rasterizer with an in-memory screen; used headless and in tests.

mod software;
mod wgpu_api;

use bytemuck::{Pod, Zeroable};

use crate::coords::{Extent, Vec2};
use crate::error::GfxError;
use crate::paint::Color;

pub use software::{SoftwareApi, SoftwareStats};
pub use wgpu_api::WgpuApi;

/// Opaque GPU texture handle. `TextureId::NONE` never names a live texture.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TextureId(pub u64);

impl TextureId {
    pub const NONE: TextureId = TextureId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Opaque framebuffer handle (an offscreen draw destination bound to a texture).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FramebufferId(pub u64);

impl FramebufferId {
    pub const NONE: FramebufferId = FramebufferId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// Texture sampling filter.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

impl FilterMode {
    #[inline]
    pub fn from_linear(linear: bool) -> Self {
        if linear { FilterMode::Linear } else { FilterMode::Nearest }
    }
}

/// Blend equation applied to subsequent draws.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// `src * a + dst * (1 - a)`, the default for straight-alpha 2D content.
    #[default]
    Alpha,
    /// `src * a + dst`.
    Additive,
    /// Source overwrites destination.
    Replace,
}

/// Vertex as submitted to the backend.
///
/// `pos` is in logical pixels; the pass [`Projection`] maps it onto the target.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl GpuVertex {
    #[inline]
    pub fn new(pos: Vec2, uv: Vec2, color: Color) -> Self {
        Self {
            pos: [pos.x, pos.y],
            uv: [uv.x, uv.y],
            color: color.to_f32(),
        }
    }
}

/// Orthographic mapping from logical pixels onto a target.
///
/// `origin` lands on the target's top-left corner, `origin + size` on its
/// bottom-right corner.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projection {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Projection {
    #[inline]
    pub const fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Identity mapping for a target of the given pixel extent.
    #[inline]
    pub fn pixels(extent: Extent) -> Self {
        Self::new(Vec2::zero(), extent.to_vec2())
    }

    /// Maps a logical point to normalized device coordinates (+Y up).
    #[inline]
    pub fn to_ndc(&self, p: Vec2) -> [f32; 2] {
        let w = if self.size.x == 0.0 { 1.0 } else { self.size.x };
        let h = if self.size.y == 0.0 { 1.0 } else { self.size.y };
        let x = (p.x - self.origin.x) / w * 2.0 - 1.0;
        let y = 1.0 - (p.y - self.origin.y) / h * 2.0;
        [x, y]
    }

    /// Maps a logical point to pixel coordinates of a target of `extent`.
    #[inline]
    pub fn to_pixels(&self, p: Vec2, extent: Extent) -> Vec2 {
        let w = if self.size.x == 0.0 { 1.0 } else { self.size.x };
        let h = if self.size.y == 0.0 { 1.0 } else { self.size.y };
        Vec2::new(
            (p.x - self.origin.x) / w * extent.width as f32,
            (p.y - self.origin.y) / h * extent.height as f32,
        )
    }
}

/// Outcome of presenting the screen.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentStatus {
    Presented,
    /// Transient surface problem; the frame was dropped.
    Skipped,
    /// Unrecoverable surface failure; the frame loop should stop.
    Fatal,
}

/// Immediate-mode graphics API consumed by the resource and batch layers.
///
/// All calls happen on the thread that owns the GPU context.
///
/// Pass protocol: `begin_pass` → any number of `set_blend_mode` / `bind_texture`
/// / `draw_triangles` → `end_pass`. Draws outside a pass are ignored.
pub trait GraphicsApi {
    /// Creates an RGBA8 texture. `pixels`, when given, must hold exactly
    /// `extent.area() * 4` bytes; otherwise the texture starts transparent.
    fn create_texture(
        &mut self,
        extent: Extent,
        pixels: Option<&[u8]>,
        filter: FilterMode,
    ) -> Result<TextureId, GfxError>;

    /// Replaces the full contents of a texture.
    fn upload_texture(&mut self, id: TextureId, pixels: &[u8]) -> Result<(), GfxError>;

    /// Reads back the full contents of a texture (RGBA8, top row first).
    fn read_texture(&mut self, id: TextureId) -> Result<Vec<u8>, GfxError>;

    fn delete_texture(&mut self, id: TextureId);

    /// Creates a draw destination writing into `texture`.
    fn create_framebuffer(&mut self, texture: TextureId) -> Result<FramebufferId, GfxError>;

    fn delete_framebuffer(&mut self, id: FramebufferId);

    /// Starts a pass on `target` (`None` = screen), optionally clearing it first.
    fn begin_pass(&mut self, target: Option<FramebufferId>, projection: Projection, clear: Option<Color>);

    fn set_blend_mode(&mut self, mode: BlendMode);

    /// Binds the texture sampled by subsequent draws; `None` draws untextured.
    fn bind_texture(&mut self, texture: Option<TextureId>);

    /// Draws a triangle list with the currently bound texture and blend mode.
    fn draw_triangles(&mut self, vertices: &[GpuVertex]);

    fn end_pass(&mut self);

    /// Current screen size in pixels.
    fn screen_extent(&self) -> Extent;

    fn resize_screen(&mut self, extent: Extent);

    /// Shows everything drawn to the screen since the last present.
    fn present(&mut self) -> PresentStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_maps_corners_to_ndc() {
        let p = Projection::new(Vec2::zero(), Vec2::new(200.0, 100.0));
        assert_eq!(p.to_ndc(Vec2::new(0.0, 0.0)), [-1.0, 1.0]);
        assert_eq!(p.to_ndc(Vec2::new(200.0, 100.0)), [1.0, -1.0]);
        assert_eq!(p.to_ndc(Vec2::new(100.0, 50.0)), [0.0, 0.0]);
    }

    #[test]
    fn projection_scales_view_onto_target() {
        let p = Projection::new(Vec2::new(10.0, 10.0), Vec2::new(50.0, 50.0));
        let px = p.to_pixels(Vec2::new(35.0, 60.0), Extent::new(100, 100));
        assert_eq!(px, Vec2::new(50.0, 100.0));
    }
}
