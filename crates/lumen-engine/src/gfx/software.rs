use std::collections::HashMap;

use crate::coords::{Extent, Vec2};
use crate::error::GfxError;
use crate::paint::Color;

use super::{
    BlendMode, FilterMode, FramebufferId, GpuVertex, GraphicsApi, PresentStatus, Projection,
    TextureId,
};

/// Counters accumulated by [`SoftwareApi`] since the last [`SoftwareApi::reset_stats`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SoftwareStats {
    pub passes: u32,
    pub texture_binds: u32,
    pub draw_calls: u32,
    pub triangles: u32,
}

struct SoftTexture {
    extent: Extent,
    filter: FilterMode,
    pixels: Vec<u8>,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum PassTarget {
    Screen,
    Texture(TextureId),
    /// Unknown framebuffer; draws are dropped.
    Discard,
}

struct Pass {
    target: PassTarget,
    projection: Projection,
}

/// CPU implementation of [`GraphicsApi`].
///
/// Rasterizes triangle lists with pixel-center sampling and a consistent
/// edge-ownership rule, so adjacent triangles never blend a pixel twice.
/// The screen is double-buffered: passes draw into the back buffer and
/// [`present`](GraphicsApi::present) copies it to the front buffer read by
/// [`screen_pixel`](Self::screen_pixel).
pub struct SoftwareApi {
    textures: HashMap<TextureId, SoftTexture>,
    framebuffers: HashMap<FramebufferId, TextureId>,
    next_id: u64,

    screen: Extent,
    back: Vec<u8>,
    front: Vec<u8>,

    pass: Option<Pass>,
    blend: BlendMode,
    bound: Option<TextureId>,

    stats: SoftwareStats,
}

impl SoftwareApi {
    pub fn new(screen: Extent) -> Self {
        Self {
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            next_id: 1,
            screen,
            back: vec![0; screen.area() * 4],
            front: vec![0; screen.area() * 4],
            pass: None,
            blend: BlendMode::Alpha,
            bound: None,
            stats: SoftwareStats::default(),
        }
    }

    /// Reads a presented screen pixel.
    pub fn screen_pixel(&self, x: u32, y: u32) -> Option<Color> {
        read_pixel(&self.front, self.screen, x, y)
    }

    /// The presented screen contents (RGBA8, top row first).
    pub fn screen_pixels(&self) -> &[u8] {
        &self.front
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn has_texture(&self, id: TextureId) -> bool {
        self.textures.contains_key(&id)
    }

    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SoftwareStats::default();
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn rasterize(&self, target: &mut [u8], extent: Extent, projection: Projection, tri: &[GpuVertex]) {
        let p: [Vec2; 3] = [0, 1, 2].map(|i| {
            projection.to_pixels(Vec2::new(tri[i].pos[0], tri[i].pos[1]), extent)
        });

        // Orient so the signed area is positive.
        let (i0, i1, i2) = if edge(p[0], p[1], p[2]) < 0.0 { (0, 2, 1) } else { (0, 1, 2) };
        let (a, b, c) = (p[i0], p[i1], p[i2]);
        let (va, vb, vc) = (&tri[i0], &tri[i1], &tri[i2]);

        let area = edge(a, b, c);
        if area <= 0.0 || !area.is_finite() {
            return;
        }

        let min_x = a.x.min(b.x).min(c.x).floor().max(0.0) as u32;
        let min_y = a.y.min(b.y).min(c.y).floor().max(0.0) as u32;
        let max_x = (a.x.max(b.x).max(c.x).ceil().max(0.0) as u32).min(extent.width);
        let max_y = (a.y.max(b.y).max(c.y).ceil().max(0.0) as u32).min(extent.height);

        let texture = self.bound.and_then(|id| self.textures.get(&id));
        let blend = self.blend;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let s = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(b, c, s);
                let w1 = edge(c, a, s);
                let w2 = edge(a, b, s);
                if !(owns(w0, b, c) && owns(w1, c, a) && owns(w2, a, b)) {
                    continue;
                }

                let (l0, l1, l2) = (w0 / area, w1 / area, w2 / area);
                let lerp = |fa: f32, fb: f32, fc: f32| fa * l0 + fb * l1 + fc * l2;

                let mut color = [0.0f32; 4];
                for (ch, out) in color.iter_mut().enumerate() {
                    *out = lerp(va.color[ch], vb.color[ch], vc.color[ch]);
                }
                let tint = Color::from_f32(color);

                let src = match texture {
                    Some(tex) => {
                        let u = lerp(va.uv[0], vb.uv[0], vc.uv[0]);
                        let v = lerp(va.uv[1], vb.uv[1], vc.uv[1]);
                        sample(tex, u, v).modulate(tint)
                    }
                    None => tint,
                };

                let idx = (y as usize * extent.width as usize + x as usize) * 4;
                let dst = Color::from_array([target[idx], target[idx + 1], target[idx + 2], target[idx + 3]]);
                let out = blend_pixel(blend, src, dst);
                target[idx..idx + 4].copy_from_slice(&out.to_array());
            }
        }
    }
}

impl GraphicsApi for SoftwareApi {
    fn create_texture(
        &mut self,
        extent: Extent,
        pixels: Option<&[u8]>,
        filter: FilterMode,
    ) -> Result<TextureId, GfxError> {
        if extent.is_empty() {
            return Err(GfxError::InvalidExtent { width: extent.width, height: extent.height });
        }
        let expected = extent.area() * 4;
        let pixels = match pixels {
            Some(p) if p.len() != expected => {
                return Err(GfxError::SizeMismatch { expected, actual: p.len() });
            }
            Some(p) => p.to_vec(),
            None => vec![0; expected],
        };

        let id = TextureId(self.alloc_id());
        self.textures.insert(id, SoftTexture { extent, filter, pixels });
        Ok(id)
    }

    fn upload_texture(&mut self, id: TextureId, pixels: &[u8]) -> Result<(), GfxError> {
        let tex = self.textures.get_mut(&id).ok_or(GfxError::UnknownTexture(id))?;
        if pixels.len() != tex.pixels.len() {
            return Err(GfxError::SizeMismatch { expected: tex.pixels.len(), actual: pixels.len() });
        }
        tex.pixels.copy_from_slice(pixels);
        Ok(())
    }

    fn read_texture(&mut self, id: TextureId) -> Result<Vec<u8>, GfxError> {
        self.textures
            .get(&id)
            .map(|t| t.pixels.clone())
            .ok_or(GfxError::UnknownTexture(id))
    }

    fn delete_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_none() {
            log::debug!("SoftwareApi: delete of unknown texture {}", id.0);
        }
        self.framebuffers.retain(|_, tex| *tex != id);
        if self.bound == Some(id) {
            self.bound = None;
        }
    }

    fn create_framebuffer(&mut self, texture: TextureId) -> Result<FramebufferId, GfxError> {
        if !self.textures.contains_key(&texture) {
            return Err(GfxError::UnknownTexture(texture));
        }
        let id = FramebufferId(self.alloc_id());
        self.framebuffers.insert(id, texture);
        Ok(id)
    }

    fn delete_framebuffer(&mut self, id: FramebufferId) {
        self.framebuffers.remove(&id);
    }

    fn begin_pass(&mut self, target: Option<FramebufferId>, projection: Projection, clear: Option<Color>) {
        if self.pass.is_some() {
            log::warn!("SoftwareApi: begin_pass while a pass is open; closing it");
            self.end_pass();
        }

        let target = match target {
            None => PassTarget::Screen,
            Some(fb) => match self.framebuffers.get(&fb) {
                Some(tex) => PassTarget::Texture(*tex),
                None => {
                    log::warn!("SoftwareApi: pass on unknown framebuffer {}; draws dropped", fb.0);
                    PassTarget::Discard
                }
            },
        };

        if let Some(color) = clear {
            let fill = color.to_array();
            let buf = match target {
                PassTarget::Screen => Some(&mut self.back),
                PassTarget::Texture(id) => self.textures.get_mut(&id).map(|t| &mut t.pixels),
                PassTarget::Discard => None,
            };
            if let Some(buf) = buf {
                for px in buf.chunks_exact_mut(4) {
                    px.copy_from_slice(&fill);
                }
            }
        }

        self.stats.passes += 1;
        self.pass = Some(Pass { target, projection });
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.stats.texture_binds += 1;
        self.bound = texture;
    }

    fn draw_triangles(&mut self, vertices: &[GpuVertex]) {
        let Some(pass) = self.pass.as_ref() else {
            log::debug!("SoftwareApi: draw outside of a pass ignored");
            return;
        };
        let (target, projection) = (pass.target, pass.projection);

        // Take the destination buffer out so sampling can borrow the texture map.
        let (mut buf, extent) = match target {
            PassTarget::Screen => (std::mem::take(&mut self.back), self.screen),
            PassTarget::Texture(id) => match self.textures.get_mut(&id) {
                Some(t) => (std::mem::take(&mut t.pixels), t.extent),
                None => return,
            },
            PassTarget::Discard => return,
        };

        self.stats.draw_calls += 1;
        for tri in vertices.chunks_exact(3) {
            self.stats.triangles += 1;
            self.rasterize(&mut buf, extent, projection, tri);
        }

        match target {
            PassTarget::Screen => self.back = buf,
            PassTarget::Texture(id) => {
                if let Some(t) = self.textures.get_mut(&id) {
                    t.pixels = buf;
                }
            }
            PassTarget::Discard => {}
        }
    }

    fn end_pass(&mut self) {
        self.pass = None;
    }

    fn screen_extent(&self) -> Extent {
        self.screen
    }

    fn resize_screen(&mut self, extent: Extent) {
        self.screen = extent;
        self.back = vec![0; extent.area() * 4];
        self.front = vec![0; extent.area() * 4];
    }

    fn present(&mut self) -> PresentStatus {
        self.front.copy_from_slice(&self.back);
        PresentStatus::Presented
    }
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// A sample exactly on an edge belongs to only one of the two triangles sharing it.
#[inline]
fn owns(w: f32, a: Vec2, b: Vec2) -> bool {
    if w > 0.0 {
        return true;
    }
    if w < 0.0 {
        return false;
    }
    let d = b - a;
    d.y > 0.0 || (d.y == 0.0 && d.x < 0.0)
}

fn read_pixel(buf: &[u8], extent: Extent, x: u32, y: u32) -> Option<Color> {
    if !extent.contains(x, y) {
        return None;
    }
    let idx = (y as usize * extent.width as usize + x as usize) * 4;
    buf.get(idx..idx + 4)
        .map(|p| Color::new(p[0], p[1], p[2], p[3]))
}

fn texel(tex: &SoftTexture, x: i64, y: i64) -> [f32; 4] {
    let x = x.clamp(0, tex.extent.width as i64 - 1) as u32;
    let y = y.clamp(0, tex.extent.height as i64 - 1) as u32;
    read_pixel(&tex.pixels, tex.extent, x, y)
        .unwrap_or(Color::WHITE)
        .to_f32()
}

fn sample(tex: &SoftTexture, u: f32, v: f32) -> Color {
    if tex.pixels.is_empty() {
        // The texture is the current pass target.
        return Color::TRANSPARENT;
    }
    let fx = u * tex.extent.width as f32;
    let fy = v * tex.extent.height as f32;

    match tex.filter {
        FilterMode::Nearest => Color::from_f32(texel(tex, fx.floor() as i64, fy.floor() as i64)),
        FilterMode::Linear => {
            let (sx, sy) = (fx - 0.5, fy - 0.5);
            let (x0, y0) = (sx.floor(), sy.floor());
            let (tx, ty) = (sx - x0, sy - y0);
            let (x0, y0) = (x0 as i64, y0 as i64);

            let c00 = texel(tex, x0, y0);
            let c10 = texel(tex, x0 + 1, y0);
            let c01 = texel(tex, x0, y0 + 1);
            let c11 = texel(tex, x0 + 1, y0 + 1);

            let mut out = [0.0f32; 4];
            for ch in 0..4 {
                let top = c00[ch] + (c10[ch] - c00[ch]) * tx;
                let bottom = c01[ch] + (c11[ch] - c01[ch]) * tx;
                out[ch] = top + (bottom - top) * ty;
            }
            Color::from_f32(out)
        }
    }
}

fn blend_pixel(mode: BlendMode, src: Color, dst: Color) -> Color {
    let s = src.to_f32();
    let d = dst.to_f32();
    let sa = s[3];
    let out = match mode {
        BlendMode::Replace => s,
        BlendMode::Alpha => [
            s[0] * sa + d[0] * (1.0 - sa),
            s[1] * sa + d[1] * (1.0 - sa),
            s[2] * sa + d[2] * (1.0 - sa),
            sa + d[3] * (1.0 - sa),
        ],
        BlendMode::Additive => [
            s[0] * sa + d[0],
            s[1] * sa + d[1],
            s[2] * sa + d[2],
            sa + d[3],
        ],
    };
    Color::from_f32(out)
}
