use crate::batch::{ApplyFlags, BatchGeometry, BatchRenderer, GeometryFactory, Primitive};
use crate::coords::Rect;
use crate::paint::Color;
use crate::time::FrameTime;

use super::SceneNode;

/// Fills the renderer's whole view with one color, behind everything else.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolidBackground {
    pub color: Color,
    pub depth: f32,
}

impl SolidBackground {
    pub fn new(color: Color) -> Self {
        Self { color, depth: f32::NEG_INFINITY }
    }
}

impl SceneNode for SolidBackground {
    fn pre_render(&mut self, factory: &GeometryFactory, renderer: &mut BatchRenderer, _time: &FrameTime) {
        let view = renderer.view();
        let mut g = BatchGeometry::new(Primitive::Rectangle(Rect::from_origin_size(view.position, view.size)));
        g.set_color(self.color);
        g.set_depth(self.depth);
        g.set_immediate(true);
        factory.apply(&mut g, ApplyFlags { depth: false, texture: false, ..ApplyFlags::ALL });
        renderer.add(g);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::View;
    use crate::coords::Extent;
    use crate::gfx::{GraphicsApi, SoftwareApi};
    use crate::time::FrameClock;

    #[test]
    fn covers_view_behind_other_geometry() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let mut renderer = BatchRenderer::new(View::pixels(Extent::new(8, 8)));
        let factory = GeometryFactory::new();

        factory.draw_rectangle(&mut renderer, Rect::new(0.0, 0.0, 4.0, 4.0), Color::RED);
        let mut bg = SolidBackground::new(Color::GREEN);
        bg.pre_render(&factory, &mut renderer, &FrameClock::new().tick());

        renderer.draw(&mut gpu, true);
        gpu.present();

        assert_eq!(gpu.screen_pixel(1, 1), Some(Color::RED));
        assert_eq!(gpu.screen_pixel(6, 6), Some(Color::GREEN));
        assert!(renderer.is_empty());
    }

    #[test]
    fn stays_behind_extreme_depths() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let mut renderer = BatchRenderer::new(View::pixels(Extent::new(8, 8)));
        let factory = GeometryFactory::new();

        let lowest = factory.draw_rectangle(&mut renderer, Rect::new(0.0, 0.0, 4.0, 8.0), Color::RED);
        renderer.geometry_mut(lowest).unwrap().set_depth(f32::MIN);
        let nan = factory.draw_rectangle(&mut renderer, Rect::new(4.0, 0.0, 4.0, 8.0), Color::BLUE);
        renderer.geometry_mut(nan).unwrap().set_depth(-f32::NAN);

        let mut bg = SolidBackground::new(Color::GREEN);
        bg.pre_render(&factory, &mut renderer, &FrameClock::new().tick());
        renderer.draw(&mut gpu, true);
        gpu.present();

        assert_eq!(gpu.screen_pixel(1, 1), Some(Color::RED));
        assert_eq!(gpu.screen_pixel(6, 6), Some(Color::BLUE));
    }
}
