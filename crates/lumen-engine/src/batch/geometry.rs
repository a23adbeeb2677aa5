use std::fmt;
use std::sync::Arc;

use crate::coords::{Extent, Rect, Vec2};
use crate::gfx::{BlendMode, GpuVertex, GraphicsApi, TextureId};
use crate::paint::Color;
use crate::resource::Texture;

/// Hooks run immediately before and after one geometry's draw.
pub trait DrawState: Send + Sync + fmt::Debug {
    fn begin(&self, gpu: &mut dyn GraphicsApi);
    fn end(&self, gpu: &mut dyn GraphicsApi);
}

/// Draws with a given blend mode, then restores alpha blending.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlendDrawState {
    pub mode: BlendMode,
}

impl BlendDrawState {
    pub const ADDITIVE: BlendDrawState = BlendDrawState { mode: BlendMode::Additive };

    pub const fn new(mode: BlendMode) -> Self {
        Self { mode }
    }
}

impl DrawState for BlendDrawState {
    fn begin(&self, gpu: &mut dyn GraphicsApi) {
        gpu.set_blend_mode(self.mode);
    }

    fn end(&self, gpu: &mut dyn GraphicsApi) {
        gpu.set_blend_mode(BlendMode::Alpha);
    }
}

/// Rotation, scale and mirroring applied to a sprite.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteOptions {
    /// Pivot for rotation and scale, in unscaled sprite pixels from its top-left.
    pub origin: Vec2,
    /// Clockwise, in radians.
    pub rotation: f32,
    pub scale: Vec2,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for SpriteOptions {
    fn default() -> Self {
        Self {
            origin: Vec2::zero(),
            rotation: 0.0,
            scale: Vec2::splat(1.0),
            flip_x: false,
            flip_y: false,
        }
    }
}

/// A textured quad placed with its pivot at `position`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Sprite {
    pub position: Vec2,
    /// Region of the texture in texel coordinates; `None` uses the whole texture.
    pub source: Option<Rect>,
    pub options: SpriteOptions,
}

impl Sprite {
    pub fn at(position: Vec2) -> Self {
        Self { position, ..Self::default() }
    }
}

/// Destination rectangle plus the texel region it samples (text glyphs, tiles).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    pub dest: Rect,
    pub source: Rect,
}

/// Shape description from which [`BatchGeometry::update`] derives vertices.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Axis-aligned rectangle stretching the whole texture (if any).
    Rectangle(Rect),
    Sprite(Sprite),
    Quads(Vec<Quad>),
    /// Raw triangle list. `uvs` is either empty or one entry per point.
    Triangles { points: Vec<Vec2>, uvs: Vec<Vec2> },
}

/// A drawable unit owned by a [`super::BatchRenderer`].
///
/// Setters only record state; vertex data changes on [`update`](Self::update),
/// except [`colorize`](Self::colorize) which recolors in place.
#[derive(Debug, Clone)]
pub struct BatchGeometry {
    primitive: Primitive,
    color: Color,
    depth: f32,
    group: i32,
    texture: Option<Arc<Texture>>,
    draw_state: Option<Arc<dyn DrawState>>,
    enabled: bool,
    immediate: bool,
    vertices: Vec<GpuVertex>,
}

impl BatchGeometry {
    pub fn new(primitive: Primitive) -> Self {
        Self {
            primitive,
            color: Color::WHITE,
            depth: 0.0,
            group: 0,
            texture: None,
            draw_state: None,
            enabled: true,
            immediate: false,
            vertices: Vec::new(),
        }
    }

    pub fn primitive(&self) -> &Primitive {
        &self.primitive
    }

    pub fn set_primitive(&mut self, primitive: Primitive) {
        self.primitive = primitive;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Sets the color and recolors the current vertices without an update.
    pub fn colorize(&mut self, color: Color) {
        self.color = color;
        let c = color.to_f32();
        for v in &mut self.vertices {
            v.color = c;
        }
    }

    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth;
    }

    pub fn group(&self) -> i32 {
        self.group
    }

    pub fn set_group(&mut self, group: i32) {
        self.group = group;
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Option<Arc<Texture>>) {
        self.texture = texture;
    }

    /// GPU id sampled by this geometry; `TextureId::NONE` when untextured.
    pub fn texture_id(&self) -> TextureId {
        self.texture.as_ref().map_or(TextureId::NONE, |t| t.texture_id())
    }

    pub fn draw_state(&self) -> Option<&Arc<dyn DrawState>> {
        self.draw_state.as_ref()
    }

    pub fn set_draw_state(&mut self, state: Option<Arc<dyn DrawState>>) {
        self.draw_state = state;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    pub fn set_immediate(&mut self, immediate: bool) {
        self.immediate = immediate;
    }

    /// Triangle list computed by the last [`update`](Self::update).
    pub fn vertices(&self) -> &[GpuVertex] {
        &self.vertices
    }

    /// Recomputes vertex positions, UVs and colors from the current state.
    pub fn update(&mut self) {
        let tex_size = self.texture.as_ref().map_or(Extent::zero(), |t| t.size());
        let color = self.color;
        let mut out = Vec::new();

        match &self.primitive {
            Primitive::Rectangle(rect) => {
                push_quad(&mut out, rect.normalized().corners(), Rect::UNIT.corners(), color);
            }
            Primitive::Sprite(sprite) => {
                let (corners, uv) = sprite_quad(sprite, tex_size);
                push_quad(&mut out, corners, uv, color);
            }
            Primitive::Quads(quads) => {
                for q in quads {
                    push_quad(&mut out, q.dest.corners(), q.source.to_uv(tex_size).corners(), color);
                }
            }
            Primitive::Triangles { points, uvs } => {
                let usable = points.len() - points.len() % 3;
                for (i, p) in points[..usable].iter().enumerate() {
                    let uv = uvs.get(i).copied().unwrap_or_default();
                    out.push(GpuVertex::new(*p, uv, color));
                }
            }
        }

        self.vertices = out;
    }
}

/// Corner order matches [`Rect::corners`]: top-left, top-right, bottom-right, bottom-left.
fn push_quad(out: &mut Vec<GpuVertex>, pos: [Vec2; 4], uv: [Vec2; 4], color: Color) {
    for i in [0, 1, 2, 0, 2, 3] {
        out.push(GpuVertex::new(pos[i], uv[i], color));
    }
}

fn sprite_quad(sprite: &Sprite, tex_size: Extent) -> ([Vec2; 4], [Vec2; 4]) {
    let source = sprite.source.unwrap_or_else(|| Rect::of_extent(tex_size));
    let opts = sprite.options;

    let local = Rect::from_origin_size(Vec2::zero(), source.size).corners();
    let corners = local.map(|c| (c - opts.origin).scale(opts.scale).rotated(opts.rotation) + sprite.position);

    let mut uv = source.to_uv(tex_size).corners();
    if opts.flip_x {
        uv = [uv[1], uv[0], uv[3], uv[2]];
    }
    if opts.flip_y {
        uv = [uv[3], uv[2], uv[1], uv[0]];
    }
    (corners, uv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::FilterMode;

    fn texture(w: u32, h: u32) -> Arc<Texture> {
        Arc::new(Texture::from_parts(TextureId(7), Extent::new(w, h), "t".into(), FilterMode::Nearest))
    }

    fn positions(g: &BatchGeometry) -> Vec<[f32; 2]> {
        g.vertices().iter().map(|v| v.pos).collect()
    }

    #[test]
    fn changes_apply_on_update() {
        let mut g = BatchGeometry::new(Primitive::Rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(g.vertices().is_empty());

        g.update();
        assert_eq!(g.vertices().len(), 6);

        g.set_primitive(Primitive::Rectangle(Rect::new(5.0, 5.0, 1.0, 1.0)));
        assert_eq!(g.vertices()[0].pos, [0.0, 0.0]);
        g.update();
        assert_eq!(g.vertices()[0].pos, [5.0, 5.0]);
    }

    #[test]
    fn colorize_is_immediate() {
        let mut g = BatchGeometry::new(Primitive::Rectangle(Rect::new(0.0, 0.0, 1.0, 1.0)));
        g.update();
        g.colorize(Color::RED);
        assert!(g.vertices().iter().all(|v| v.color == Color::RED.to_f32()));
    }

    #[test]
    fn sprite_uses_source_region() {
        let mut g = BatchGeometry::new(Primitive::Sprite(Sprite {
            position: Vec2::new(100.0, 50.0),
            source: Some(Rect::new(8.0, 0.0, 8.0, 16.0)),
            options: SpriteOptions::default(),
        }));
        g.set_texture(Some(texture(16, 16)));
        g.update();

        let v = g.vertices();
        assert_eq!(v[0].pos, [100.0, 50.0]);
        assert_eq!(v[0].uv, [0.5, 0.0]);
        assert_eq!(v[2].pos, [108.0, 66.0]);
        assert_eq!(v[2].uv, [1.0, 1.0]);
    }

    #[test]
    fn sprite_scales_and_flips_around_origin() {
        let mut g = BatchGeometry::new(Primitive::Sprite(Sprite {
            position: Vec2::new(10.0, 10.0),
            source: None,
            options: SpriteOptions {
                origin: Vec2::new(2.0, 2.0),
                scale: Vec2::splat(2.0),
                flip_x: true,
                ..SpriteOptions::default()
            },
        }));
        g.set_texture(Some(texture(4, 4)));
        g.update();

        let v = g.vertices();
        assert_eq!(v[0].pos, [6.0, 6.0]);
        assert_eq!(v[0].uv, [1.0, 0.0]);
        assert_eq!(v[2].pos, [14.0, 14.0]);
        assert_eq!(v[2].uv, [0.0, 1.0]);
    }

    #[test]
    fn triangles_drop_incomplete_tail() {
        let mut g = BatchGeometry::new(Primitive::Triangles {
            points: vec![Vec2::zero(), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(5.0, 5.0)],
            uvs: Vec::new(),
        });
        g.update();
        assert_eq!(positions(&g), vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    }
}
