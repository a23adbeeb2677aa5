use super::{Extent, Vec2};

/// Axis-aligned rectangle, top-left origin.
///
/// Used both for destination areas in logical pixels and for source areas
/// in texels of a texture.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    /// The full `[0, 1]` texture coordinate range.
    pub const UNIT: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub const fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Whole texture area in texels.
    #[inline]
    pub fn of_extent(extent: Extent) -> Self {
        Self::from_origin_size(Vec2::zero(), extent.to_vec2())
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.origin.x + self.size.x
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.origin.y + self.size.y
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Same area with non-negative width and height.
    pub fn normalized(self) -> Self {
        let Rect { mut origin, mut size } = self;
        if size.x < 0.0 {
            origin.x += size.x;
            size.x = -size.x;
        }
        if size.y < 0.0 {
            origin.y += size.y;
            size.y = -size.y;
        }
        Rect { origin, size }
    }

    /// Corners in quad order: top-left, top-right, bottom-right, bottom-left.
    #[inline]
    pub fn corners(self) -> [Vec2; 4] {
        let (l, t, r, b) = (self.origin.x, self.origin.y, self.right(), self.bottom());
        [Vec2::new(l, t), Vec2::new(r, t), Vec2::new(r, b), Vec2::new(l, b)]
    }

    /// Maps a texel area of a `texture`-sized image to texture coordinates.
    ///
    /// An empty texture maps everything to the origin.
    pub fn to_uv(self, texture: Extent) -> Rect {
        if texture.is_empty() {
            return Rect::default();
        }
        let (w, h) = (texture.width as f32, texture.height as f32);
        Rect::new(self.origin.x / w, self.origin.y / h, self.size.x / w, self.size.y / h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_flips_negative_sizes() {
        let rect = Rect::new(1.0, 2.0, 10.0, 20.0);
        assert_eq!(rect.normalized(), rect);

        let n = Rect::new(10.0, 8.0, -4.0, -3.0).normalized();
        assert_eq!(n, Rect::new(6.0, 5.0, 4.0, 3.0));
    }

    #[test]
    fn corners_follow_quad_order() {
        let c = Rect::new(1.0, 2.0, 3.0, 4.0).corners();
        assert_eq!(c, [Vec2::new(1.0, 2.0), Vec2::new(4.0, 2.0), Vec2::new(4.0, 6.0), Vec2::new(1.0, 6.0)]);
    }

    #[test]
    fn texel_area_maps_to_uv() {
        let uv = Rect::new(8.0, 0.0, 8.0, 16.0).to_uv(Extent::new(16, 32));
        assert_eq!(uv, Rect::new(0.5, 0.0, 0.5, 0.5));
        assert_eq!(Rect::of_extent(Extent::new(16, 32)).to_uv(Extent::new(16, 32)), Rect::UNIT);
        assert_eq!(Rect::new(1.0, 1.0, 1.0, 1.0).to_uv(Extent::zero()), Rect::default());
    }

    #[test]
    fn zero_size_is_empty() {
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
