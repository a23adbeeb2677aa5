//! Frame-loop tests on the headless backend.
//!
//! The render system is a process-wide singleton, so every test holds
//! `SERIAL` while a system is alive.

use lumen_engine::batch::{BatchRenderer, View};
use lumen_engine::coords::{Extent, Rect, Vec2};
use lumen_engine::gfx::{GraphicsApi, SoftwareApi};
use lumen_engine::paint::Color;
use lumen_engine::resource::FAILED_TEXTURE_NAME;
use lumen_engine::window::{HeadlessWindow, Key, WindowEvent, WindowSystem};
use lumen_engine::{EngineError, RenderSystem, SystemConfig};
use parking_lot::Mutex;

static SERIAL: Mutex<()> = Mutex::new(());

type Headless = RenderSystem<SoftwareApi, HeadlessWindow>;

fn config() -> SystemConfig {
    SystemConfig {
        screen_size: Extent::new(320, 240),
        ..SystemConfig::default()
    }
}

fn headless() -> Headless {
    RenderSystem::headless(config()).unwrap()
}

#[test]
fn render_target_is_composited_onto_screen() {
    let _serial = SERIAL.lock();
    let mut system = headless();

    let size = Extent::new(256, 256);
    let target = system.create_render_target(size, false);
    assert!(target.is_valid());

    let mut offscreen = BatchRenderer::new(View::pixels(size));
    offscreen.set_clear_color(Color::BLUE);
    assert!(offscreen.set_render_target(Some(target.clone())));

    let factory = system.factory().clone();
    factory.draw_rectangle(&mut offscreen, Rect::new(50.0, 50.0, 100.0, 100.0), Color::RED);
    let stats = system.draw_batch(&mut offscreen, true);
    assert_eq!(stats.geometry, 1);

    system.draw_texture(target.texture(), Vec2::zero());
    assert!(system.run_frame());

    assert_eq!(system.gpu().screen_pixel(75, 75), Some(Color::RED));
    assert_eq!(system.gpu().screen_pixel(10, 10), Some(Color::BLUE));
    // Outside the composited texture the screen keeps its own clear color.
    assert_eq!(system.gpu().screen_pixel(300, 200), Some(Color::BLACK));
}

#[test]
fn second_initialization_fails_until_teardown() {
    let _serial = SERIAL.lock();

    let first = headless();
    assert!(Headless::is_initialized());
    assert!(matches!(RenderSystem::headless(config()), Err(EngineError::AlreadyInitialized)));

    drop(first);
    assert!(!Headless::is_initialized());
    let again = RenderSystem::headless(config());
    assert!(again.is_ok());
}

#[test]
fn failed_backend_releases_the_singleton() {
    let _serial = SERIAL.lock();

    let result: Result<Headless, _> = RenderSystem::initialize(config(), HeadlessWindow::new(Extent::new(1, 1)), |_| {
        Err(anyhow::anyhow!("no adapter"))
    });
    assert!(matches!(result, Err(EngineError::Graphics(_))));
    assert!(!Headless::is_initialized());
}

#[test]
fn escape_press_stops_the_loop() {
    let _serial = SERIAL.lock();
    let mut system = headless();

    system.window_mut().push_event(WindowEvent::key_pressed(Key::A));
    system.window_mut().push_event(WindowEvent::key_released(Key::Escape));
    assert!(system.run_frame());

    system.window_mut().push_event(WindowEvent::key_pressed(Key::Escape));
    assert!(!system.run_frame());
    assert!(!system.run_frame());
    assert!(system.window().is_closed());
}

#[test]
fn close_event_stops_the_loop() {
    let _serial = SERIAL.lock();
    let mut system = headless();

    system.window_mut().push_event(WindowEvent::Close);
    assert!(!system.run_frame());
}

#[test]
fn resize_updates_screen_when_resizable() {
    let _serial = SERIAL.lock();
    let mut system = headless();

    system.window_mut().push_event(WindowEvent::Resize(Extent::new(400, 300)));
    assert!(system.run_frame());

    assert_eq!(system.screen_size(), Extent::new(400, 300));
    assert_eq!(system.gpu().screen_extent(), Extent::new(400, 300));
    assert_eq!(system.screen().view(), View::pixels(Extent::new(400, 300)));
}

#[test]
fn resize_is_reverted_when_not_resizable() {
    let _serial = SERIAL.lock();
    let mut system = RenderSystem::headless(SystemConfig {
        resizable: false,
        ..config()
    })
    .unwrap();

    system.window_mut().push_event(WindowEvent::Resize(Extent::new(400, 300)));
    assert!(system.run_frame());

    assert_eq!(system.screen_size(), Extent::new(320, 240));
    assert_eq!(system.window().size(), Extent::new(320, 240));
    assert_eq!(system.gpu().screen_extent(), Extent::new(320, 240));
}

#[test]
fn missing_file_yields_placeholder() {
    let _serial = SERIAL.lock();
    let mut system = headless();
    let registered = system.resources().count();

    let texture = system.load_texture_from_file("does/not/exist.png", false);
    assert_eq!(texture.name(), FAILED_TEXTURE_NAME);
    assert_eq!(texture.size(), Extent::zero());
    assert!(texture.texture_id().is_none());
    assert_eq!(system.resources().count(), registered);

    // Drawing the placeholder is harmless.
    system.draw_texture(&texture, Vec2::zero());
    assert!(system.run_frame());
}

#[test]
fn raw_memory_texture_is_drawn_and_found() {
    let _serial = SERIAL.lock();
    let mut system = headless();

    let pixels: Vec<u8> = std::iter::repeat_n(Color::GREEN.to_array(), 4).flatten().collect();
    let texture = system.load_texture_from_memory(&pixels, 2, 2, false);
    assert!(!texture.is_failed());

    let found = system.find_texture_by_id(texture.texture_id()).unwrap();
    assert_eq!(found.name(), texture.name());
    assert!(system.find_texture(texture.name()).is_some());

    system.draw_texture(&texture, Vec2::new(10.0, 10.0));
    assert!(system.run_frame());
    assert_eq!(system.gpu().screen_pixel(11, 11), Some(Color::GREEN));
    assert_eq!(system.gpu().screen_pixel(12, 12), Some(Color::BLACK));
}

#[test]
fn clean_waits_for_geometry_to_release_textures() {
    let _serial = SERIAL.lock();
    let mut system = headless();
    let registered = system.resources().count();

    let texture = system.load_texture_from_memory(&[255; 16], 2, 2, false);
    let id = texture.texture_id();
    system.draw_texture(&texture, Vec2::zero());
    drop(texture);

    // The queued sprite still references the texture during this frame's clean.
    assert!(system.run_frame());
    assert!(system.gpu().has_texture(id));
    assert_eq!(system.resources().count(), registered + 1);

    // The sprite was immediate; the next clean reclaims the texture.
    assert!(system.run_frame());
    assert!(!system.gpu().has_texture(id));
    assert_eq!(system.resources().count(), registered);
}

#[test]
fn depth_decides_overlap_on_screen() {
    let _serial = SERIAL.lock();
    let mut system = headless();

    let front = system.draw_rectangle(Rect::new(0.0, 0.0, 20.0, 20.0), Color::RED);
    system.draw_rectangle(Rect::new(0.0, 0.0, 20.0, 20.0), Color::BLUE);
    system.screen_mut().geometry_mut(front).unwrap().set_depth(5.0);

    assert!(system.run_frame());
    assert_eq!(system.gpu().screen_pixel(5, 5), Some(Color::RED));
    assert_eq!(system.last_stats().geometry, 2);
}

#[test]
fn builtin_font_is_loaded_and_registered() {
    let _serial = SERIAL.lock();
    let system = headless();

    let font = system.font().unwrap();
    let atlas = font.texture();
    assert_eq!(atlas.name(), "default font 16px");
    assert!(system.gpu().has_texture(atlas.texture_id()));

    let found = system.find_texture(atlas.name()).unwrap();
    assert_eq!(found.texture_id(), atlas.texture_id());
}

#[test]
fn text_takes_factory_depth_and_group() {
    let _serial = SERIAL.lock();
    let mut system = headless();
    let atlas = system.font().unwrap().texture().texture_id();

    system.factory_mut().depth = 3.0;
    system.factory_mut().group = 2;
    let id = system.draw_text("Hi there", Vec2::new(8.0, 8.0), Color::WHITE).unwrap();

    let text = system.screen().geometry(id).unwrap();
    assert_eq!(text.texture_id(), atlas);
    assert_eq!((text.depth(), text.group()), (3.0, 2));
    assert!(text.is_immediate());
    // Seven visible glyphs, two triangles each.
    assert_eq!(text.vertices().len(), 7 * 6);
}

#[test]
fn text_is_drawn_for_one_frame() {
    let _serial = SERIAL.lock();
    let mut system = headless();

    let origin = Vec2::new(8.0, 8.0);
    let size = system.font().unwrap().measure("Lumen");
    system.draw_text("Lumen", origin, Color::WHITE).unwrap();
    assert!(system.run_frame());
    assert_eq!(system.last_stats().geometry, 1);

    let lit = |system: &Headless| {
        let (x0, y0) = (origin.x as u32, origin.y as u32);
        let (x1, y1) = ((origin.x + size.x) as u32, (origin.y + size.y) as u32);
        (y0..y1).any(|y| (x0..x1).any(|x| system.gpu().screen_pixel(x, y) != Some(Color::BLACK)))
    };
    assert!(lit(&system));

    // Text runs are immediate and gone after the frame.
    assert!(system.screen().is_empty());
    assert!(system.run_frame());
    assert!(!lit(&system));
}

#[test]
fn configured_font_replaces_the_builtin_one() {
    let _serial = SERIAL.lock();
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/src/text/fonts/DejaVuSansMono.ttf");
    let system = RenderSystem::headless(SystemConfig {
        font: Some(path.into()),
        font_size: 24.0,
        ..config()
    })
    .unwrap();

    let font = system.font().unwrap();
    assert_eq!(font.texture().name(), "font atlas 24px");
    assert_eq!(font.px_size(), 24.0);
}

#[test]
fn unreadable_font_falls_back_to_the_builtin_one() {
    let _serial = SERIAL.lock();
    let system = RenderSystem::headless(SystemConfig {
        font: Some("does/not/exist.ttf".into()),
        ..config()
    })
    .unwrap();

    assert_eq!(system.font().unwrap().texture().name(), "default font 16px");
}
