use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};

use crate::batch::{BatchGeometry, Primitive, Quad};
use crate::coords::{Extent, Rect, Vec2};
use crate::gfx::{FilterMode, GraphicsApi};
use crate::paint::Color;
use crate::resource::Texture;

/// Error returned by [`BitmapFont::from_bytes`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

const ATLAS_WIDTH: u32 = 512;
const GLYPH_PADDING: u32 = 1; // pixels between glyphs in the atlas

/// DejaVu Sans Mono, baked by [`BitmapFont::builtin`].
pub const DEFAULT_FONT: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// Printable ASCII, baked into every atlas.
const CHARSET: core::ops::RangeInclusive<char> = ' '..='~';

/// Row-based ("shelf") placement of glyph bitmaps in a fixed-width atlas.
#[derive(Debug)]
struct ShelfPacker {
    width: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
}

impl ShelfPacker {
    fn new(width: u32) -> Self {
        Self {
            width,
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
        }
    }

    /// Returns the top-left corner for a `w`x`h` bitmap, or `None` if it is
    /// wider than the atlas.
    fn place(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w + 2 * GLYPH_PADDING > self.width {
            return None;
        }
        if self.cursor_x + w + GLYPH_PADDING > self.width {
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.cursor_x = GLYPH_PADDING;
            self.row_height = 0;
        }
        let at = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);
        Some(at)
    }

    /// Atlas height needed for everything placed so far.
    fn height(&self) -> u32 {
        (self.cursor_y + self.row_height + GLYPH_PADDING).max(1)
    }
}

/// A font rasterized once, at one pixel size, into an RGBA atlas texture.
///
/// Glyphs are white with coverage in alpha, so geometry color tints the text.
/// Text runs become [`Primitive::Quads`] geometry sampling the atlas.
pub struct BitmapFont {
    font: fontdue::Font,
    px_size: f32,
    texture: Arc<Texture>,
    glyphs: HashMap<char, Rect>,
}

impl fmt::Debug for BitmapFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapFont")
            .field("px_size", &self.px_size)
            .field("texture", &self.texture.name())
            .field("glyphs", &self.glyphs.len())
            .finish()
    }
}

impl BitmapFont {
    /// Parses a TrueType/OpenType font and bakes its atlas at `px_size`.
    pub fn from_bytes(gpu: &mut dyn GraphicsApi, bytes: &[u8], px_size: f32) -> Result<Self, FontLoadError> {
        Self::bake(gpu, "font atlas", bytes, px_size)
    }

    /// Bakes the font embedded in the engine. Its atlas is named
    /// `default font <size>px`.
    pub fn builtin(gpu: &mut dyn GraphicsApi, px_size: f32) -> Result<Self, FontLoadError> {
        Self::bake(gpu, "default font", DEFAULT_FONT, px_size)
    }

    fn bake(gpu: &mut dyn GraphicsApi, label: &str, bytes: &[u8], px_size: f32) -> Result<Self, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let px_size = px_size.max(1.0);

        let mut packer = ShelfPacker::new(ATLAS_WIDTH);
        let mut placed = Vec::new();
        for ch in CHARSET {
            let (metrics, bitmap) = font.rasterize(ch, px_size);
            if metrics.width == 0 || metrics.height == 0 {
                continue;
            }
            let (w, h) = (metrics.width as u32, metrics.height as u32);
            let Some((x, y)) = packer.place(w, h) else {
                log::warn!("BitmapFont: glyph '{ch}' ({w}x{h}) does not fit the atlas");
                continue;
            };
            placed.push((ch, x, y, w, h, bitmap));
        }

        let extent = Extent::new(ATLAS_WIDTH, packer.height());
        let mut pixels = vec![0u8; extent.area() * 4];
        let mut glyphs = HashMap::with_capacity(placed.len());

        for (ch, x, y, w, h, bitmap) in placed {
            for row in 0..h {
                for col in 0..w {
                    let coverage = bitmap[(row * w + col) as usize];
                    let i = (((y + row) * extent.width + x + col) * 4) as usize;
                    pixels[i..i + 4].copy_from_slice(&[255, 255, 255, coverage]);
                }
            }
            glyphs.insert(ch, Rect::new(x as f32, y as f32, w as f32, h as f32));
        }

        let name = format!("{label} {px_size}px");
        let texture = Texture::from_pixels(gpu, name, extent, &pixels, FilterMode::Linear);
        if texture.is_failed() {
            return Err(FontLoadError("atlas texture creation failed".into()));
        }
        log::debug!("BitmapFont: baked {} glyphs into {}x{}", glyphs.len(), extent.width, extent.height);

        Ok(Self {
            font,
            px_size,
            texture: Arc::new(texture),
            glyphs,
        })
    }

    pub fn px_size(&self) -> f32 {
        self.px_size
    }

    /// Atlas texture; register it with the resource manager to keep it alive.
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    pub fn has_glyph(&self, ch: char) -> bool {
        self.glyphs.contains_key(&ch)
    }

    fn layout(&self, text: &str, position: Vec2) -> Layout<()> {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: position.x,
            y: position.y,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.px_size, 0));
        layout
    }

    /// Lays out `text` with its top-left at `position`.
    ///
    /// Characters missing from the atlas are skipped.
    pub fn quads(&self, text: &str, position: Vec2) -> Vec<Quad> {
        self.layout(text, position)
            .glyphs()
            .iter()
            .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
            .filter_map(|g| {
                let source = *self.glyphs.get(&g.parent)?;
                Some(Quad {
                    dest: Rect::new(g.x, g.y, g.width as f32, g.height as f32),
                    source,
                })
            })
            .collect()
    }

    /// Builds updated text geometry sampling the atlas.
    pub fn text_geometry(&self, text: &str, position: Vec2, color: Color) -> BatchGeometry {
        let mut geometry = BatchGeometry::new(Primitive::Quads(self.quads(text, position)));
        geometry.set_texture(Some(self.texture.clone()));
        geometry.set_color(color);
        geometry.update();
        geometry
    }

    /// Bounding size of `text` in pixels.
    pub fn measure(&self, text: &str) -> Vec2 {
        let layout = self.layout(text, Vec2::zero());
        let glyphs = layout.glyphs();
        if glyphs.is_empty() {
            return Vec2::new(0.0, self.px_size * 1.2);
        }

        // Pen position after each glyph, not the bitmap's right edge.
        let w = glyphs
            .iter()
            .map(|g| {
                let m = self.font.metrics_indexed(g.key.glyph_index, self.px_size);
                (g.x - m.xmin as f32 + m.advance_width).max(0.0)
            })
            .fold(0.0f32, f32::max);
        let h = glyphs
            .iter()
            .map(|g| g.y + g.height as f32)
            .fold(self.px_size, f32::max);
        Vec2::new(w, h)
    }
}
