use crate::coords::{Extent, Vec2};
use crate::gfx::Projection;

/// Logical region of the scene mapped onto a renderer's target.
///
/// `position` lands on the target's top-left corner. A zero `size` follows
/// the target's pixel extent.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct View {
    pub position: Vec2,
    pub size: Vec2,
}

impl View {
    #[inline]
    pub const fn new(position: Vec2, size: Vec2) -> Self {
        Self { position, size }
    }

    /// View covering `extent` pixels one to one.
    #[inline]
    pub fn pixels(extent: Extent) -> Self {
        Self::new(Vec2::zero(), extent.to_vec2())
    }

    pub(crate) fn projection(&self, target: Extent) -> Projection {
        let size = if self.size.x == 0.0 || self.size.y == 0.0 {
            target.to_vec2()
        } else {
            self.size
        };
        Projection::new(self.position, size)
    }
}
