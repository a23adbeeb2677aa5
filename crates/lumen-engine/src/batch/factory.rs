use std::sync::Arc;

use crate::coords::{Rect, Vec2};
use crate::paint::Color;
use crate::resource::Texture;

use super::{BatchGeometry, BatchRenderer, DrawState, GeometryId, Primitive, Sprite, SpriteOptions};

/// Which factory defaults [`GeometryFactory::apply`] copies onto a geometry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ApplyFlags {
    pub depth: bool,
    pub group: bool,
    pub texture: bool,
    /// Begin/end draw state.
    pub functions: bool,
    /// Call [`BatchGeometry::update`] afterwards.
    pub update: bool,
}

impl ApplyFlags {
    pub const NONE: ApplyFlags = ApplyFlags {
        depth: false,
        group: false,
        texture: false,
        functions: false,
        update: false,
    };

    pub const ALL_NO_UPDATE: ApplyFlags = ApplyFlags {
        depth: true,
        group: true,
        texture: true,
        functions: true,
        update: false,
    };

    pub const ALL: ApplyFlags = ApplyFlags {
        update: true,
        ..Self::ALL_NO_UPDATE
    };
}

impl Default for ApplyFlags {
    fn default() -> Self {
        Self::ALL
    }
}

/// Default depth/group/texture/draw state stamped onto new geometry.
#[derive(Debug, Clone, Default)]
pub struct GeometryFactory {
    pub depth: f32,
    pub group: i32,
    pub texture: Option<Arc<Texture>>,
    pub draw_state: Option<Arc<dyn DrawState>>,
}

impl GeometryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, geometry: &mut BatchGeometry, flags: ApplyFlags) {
        if flags.depth {
            geometry.set_depth(self.depth);
        }
        if flags.group {
            geometry.set_group(self.group);
        }
        if flags.texture {
            geometry.set_texture(self.texture.clone());
        }
        if flags.functions {
            geometry.set_draw_state(self.draw_state.clone());
        }
        if flags.update {
            geometry.update();
        }
    }

    fn submit(&self, renderer: &mut BatchRenderer, mut geometry: BatchGeometry, flags: ApplyFlags) -> GeometryId {
        geometry.set_immediate(true);
        self.apply(&mut geometry, flags);
        renderer.add(geometry)
    }

    /// Immediate rectangle, textured with the factory texture if one is set.
    pub fn draw_rectangle(&self, renderer: &mut BatchRenderer, rect: Rect, color: Color) -> GeometryId {
        let mut g = BatchGeometry::new(Primitive::Rectangle(rect));
        g.set_color(color);
        self.submit(renderer, g, ApplyFlags::ALL)
    }

    /// Immediate sprite of the whole texture with its top-left at `position`.
    pub fn draw_texture(&self, renderer: &mut BatchRenderer, texture: &Arc<Texture>, position: Vec2) -> GeometryId {
        self.draw_texture_part(renderer, texture, position, None, SpriteOptions::default())
    }

    /// Immediate sprite of `source` (whole texture when `None`).
    pub fn draw_texture_part(
        &self,
        renderer: &mut BatchRenderer,
        texture: &Arc<Texture>,
        position: Vec2,
        source: Option<Rect>,
        options: SpriteOptions,
    ) -> GeometryId {
        let mut g = BatchGeometry::new(Primitive::Sprite(Sprite { position, source, options }));
        g.set_texture(Some(texture.clone()));
        self.submit(renderer, g, ApplyFlags { texture: false, ..ApplyFlags::ALL })
    }

    pub fn draw_triangle(&self, renderer: &mut BatchRenderer, points: [Vec2; 3], color: Color) -> GeometryId {
        let mut g = BatchGeometry::new(Primitive::Triangles {
            points: points.to_vec(),
            uvs: Vec::new(),
        });
        g.set_color(color);
        self.submit(renderer, g, ApplyFlags { texture: false, ..ApplyFlags::ALL })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BlendDrawState, View};
    use crate::coords::Extent;
    use crate::gfx::{FilterMode, TextureId};

    fn texture(id: u64) -> Arc<Texture> {
        Arc::new(Texture::from_parts(TextureId(id), Extent::new(8, 8), format!("t{id}"), FilterMode::Nearest))
    }

    fn factory() -> GeometryFactory {
        GeometryFactory {
            depth: 3.5,
            group: 2,
            texture: Some(texture(1)),
            draw_state: Some(Arc::new(BlendDrawState::ADDITIVE)),
        }
    }

    #[test]
    fn apply_respects_flags() {
        let f = factory();
        let mut g = BatchGeometry::new(Primitive::Rectangle(Rect::new(0.0, 0.0, 1.0, 1.0)));

        f.apply(&mut g, ApplyFlags::NONE);
        assert_eq!(g.depth(), 0.0);
        assert!(g.texture().is_none());

        f.apply(&mut g, ApplyFlags { depth: true, ..ApplyFlags::NONE });
        assert_eq!(g.depth(), 3.5);
        assert_eq!(g.group(), 0);

        f.apply(&mut g, ApplyFlags::ALL_NO_UPDATE);
        assert_eq!(g.group(), 2);
        assert_eq!(g.texture_id(), TextureId(1));
        assert!(g.draw_state().is_some());
        assert!(g.vertices().is_empty());

        f.apply(&mut g, ApplyFlags::ALL);
        assert_eq!(g.vertices().len(), 6);
    }

    #[test]
    fn draw_helpers_create_immediate_geometry() {
        let f = factory();
        let mut r = BatchRenderer::new(View::default());

        let rect = f.draw_rectangle(&mut r, Rect::new(0.0, 0.0, 4.0, 4.0), Color::RED);
        let sprite = f.draw_texture(&mut r, &texture(9), Vec2::new(1.0, 1.0));
        let tri = f.draw_triangle(&mut r, [Vec2::zero(), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)], Color::BLUE);

        let rect = r.geometry(rect).unwrap();
        assert!(rect.is_immediate());
        assert_eq!(rect.depth(), 3.5);
        assert_eq!(rect.texture_id(), TextureId(1));
        assert_eq!(rect.vertices()[0].color, Color::RED.to_f32());

        let sprite = r.geometry(sprite).unwrap();
        assert_eq!(sprite.texture_id(), TextureId(9));
        assert_eq!(sprite.group(), 2);
        assert_eq!(sprite.vertices()[2].pos, [9.0, 9.0]);

        let tri = r.geometry(tri).unwrap();
        assert!(tri.texture().is_none());
        assert_eq!(tri.vertices().len(), 3);
    }
}
