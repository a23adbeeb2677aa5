/// Straight-alpha RGBA color, 8 bits per channel.
///
/// This is the unit of texture pixel access (`get_pixel` / `set_pixel`) and of
/// per-vertex tinting. Vertex colors modulate texels channel by channel.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub const fn from_array(v: [u8; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    /// Normalized `[0, 1]` channels, as uploaded in vertex data.
    #[inline]
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    /// Inverse of [`to_f32`](Self::to_f32); channels are clamped and rounded.
    #[inline]
    pub fn from_f32(v: [f32; 4]) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(v[0]), q(v[1]), q(v[2]), q(v[3]))
    }

    /// Channel-wise product, the way texels are tinted by vertex colors.
    #[inline]
    pub fn modulate(self, other: Color) -> Color {
        let m = |a: u8, b: u8| ((a as u16 * b as u16 + 127) / 255) as u8;
        Color::new(
            m(self.r, other.r),
            m(self.g, other.g),
            m(self.b, other.b),
            m(self.a, other.a),
        )
    }

    /// `wgpu` clear value for this color.
    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.to_f32();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_roundtrip_is_exact_for_u8_channels() {
        let c = Color::new(12, 200, 255, 25);
        assert_eq!(Color::from_f32(c.to_f32()), c);
    }

    #[test]
    fn modulate_by_white_is_identity() {
        let c = Color::new(100, 200, 255, 25);
        assert_eq!(c.modulate(Color::WHITE), c);
        assert_eq!(Color::WHITE.modulate(c), c);
    }

    #[test]
    fn modulate_by_transparent_clears() {
        assert_eq!(Color::RED.modulate(Color::TRANSPARENT), Color::TRANSPARENT);
    }
}
