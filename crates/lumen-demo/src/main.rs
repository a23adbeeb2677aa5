//! Interactive render-target compositing demo.
//!
//! A spinning triangle and a bouncing rectangle are drawn into a 256x256
//! render target, which is then composited onto the screen twice.
//! The frame rate is printed in the corner. Pass an image path to also show a
//! loaded texture, and a font path as the second argument to print with it.
//! Escape or closing the window quits.

use anyhow::Result;

use lumen_engine::batch::{BatchRenderer, BlendDrawState, SpriteOptions, View};
use lumen_engine::coords::{Extent, Rect, Vec2};
use lumen_engine::logging::LoggingConfig;
use lumen_engine::paint::Color;
use lumen_engine::scene::SolidBackground;
use lumen_engine::{RenderSystem, SystemConfig};

const TARGET_SIZE: Extent = Extent::new(256, 256);

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let image = args.next();
    let font = args.next();

    let config = SystemConfig {
        title: "lumen render targets".to_string(),
        screen_size: Extent::new(960, 540),
        clear_color: Color::rgb(24, 24, 32),
        font: font.map(Into::into),
        logging: Some(LoggingConfig::default()),
        ..SystemConfig::default()
    };

    let mut system = RenderSystem::windowed(config)?;
    system.add_node(Box::new(SolidBackground::new(Color::rgb(24, 24, 32))));

    let target = system.create_render_target(TARGET_SIZE, false);
    let mut offscreen = BatchRenderer::new(View::pixels(TARGET_SIZE));
    offscreen.set_clear_color(Color::BLUE);
    offscreen.set_render_target(Some(target.clone()));

    let picture = image.map(|path| system.load_texture_from_file(path, true));
    if picture.as_ref().is_some_and(|p| p.is_failed()) {
        log::warn!("image could not be loaded; drawing the placeholder");
    }

    // Defaults never change here, so one copy serves every frame.
    let factory = system.factory().clone();
    let mirrored = SpriteOptions {
        flip_x: true,
        scale: Vec2::splat(0.5),
        ..SpriteOptions::default()
    };

    let mut t = 0.0f32;
    loop {
        t += 1.0 / 60.0;

        let bounce = (t * 2.0).sin().abs() * 100.0;
        factory.draw_rectangle(&mut offscreen, Rect::new(50.0, 50.0 + bounce * 0.5, 100.0, 100.0), Color::RED);

        let center = Vec2::new(128.0, 128.0);
        let points = [0.0f32, 2.094, 4.189].map(|a| center + Vec2::new(0.0, -90.0).rotated(a + t));
        let tri = factory.draw_triangle(&mut offscreen, points, Color::GREEN.with_alpha(160));
        if let Some(g) = offscreen.geometry_mut(tri) {
            g.set_depth(1.0);
            g.set_draw_state(Some(std::sync::Arc::new(BlendDrawState::ADDITIVE)));
        }

        system.draw_batch(&mut offscreen, true);

        system.draw_texture(target.texture(), Vec2::new(40.0, 40.0));
        factory.draw_texture_part(system.screen_mut(), target.texture(), Vec2::new(340.0, 40.0), None, mirrored);

        if let Some(picture) = &picture {
            system.draw_texture(picture, Vec2::new(560.0, 40.0));
        }

        let fps = format!("{:.0} fps", system.framerate());
        system.draw_text(&fps, Vec2::new(40.0, 320.0), Color::WHITE);

        if !system.run_frame() {
            break;
        }
    }

    log::info!("demo finished after {t:.1}s");
    Ok(())
}
