use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;

use crate::batch::{ApplyFlags, BatchRenderer, BatchStats, GeometryFactory, GeometryId, View};
use crate::coords::{Extent, Rect, Vec2};
use crate::device::Gpu;
use crate::error::EngineError;
use crate::gfx::{FilterMode, GraphicsApi, PresentStatus, SoftwareApi, TextureId, WgpuApi};
use crate::logging::init_logging;
use crate::paint::Color;
use crate::resource::{ImageCrateDecoder, ImageDecoder, RenderTarget, Resource, ResourceManager, Texture};
use crate::scene::SceneNode;
use crate::text::{BitmapFont, FontLoadError};
use crate::time::FrameClock;
use crate::window::{HeadlessWindow, Key, WindowEvent, WindowSystem, WinitWindow};

use super::SystemConfig;

/// Set while a [`RenderSystem`] is alive.
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Process-wide owner of the window, the GPU backend and all shared resources.
///
/// Exactly one may exist at a time: [`initialize`](Self::initialize) fails with
/// [`EngineError::AlreadyInitialized`] while another is alive, and dropping the
/// system releases every resource and the guard.
///
/// Each [`run_frame`](Self::run_frame) polls window events, reclaims
/// unreferenced resources, lets scene nodes submit geometry, clears and draws
/// the screen batch, then presents.
pub struct RenderSystem<G: GraphicsApi, W: WindowSystem> {
    gpu: G,
    window: W,

    resources: ResourceManager,
    decoder: Box<dyn ImageDecoder>,
    factory: GeometryFactory,
    screen: BatchRenderer,
    nodes: Vec<Box<dyn SceneNode>>,
    font: Option<BitmapFont>,

    clock: FrameClock,
    screen_size: Extent,
    config: SystemConfig,
    memory_textures: u64,
    last_stats: BatchStats,
    quit: bool,
}

impl RenderSystem<SoftwareApi, HeadlessWindow> {
    /// System rendering on the CPU into an in-memory screen, with scripted events.
    pub fn headless(config: SystemConfig) -> Result<Self, EngineError> {
        let window = HeadlessWindow::new(config.screen_size);
        Self::initialize(config, window, |w| Ok(SoftwareApi::new(w.size())))
    }
}

impl RenderSystem<WgpuApi, WinitWindow> {
    /// Opens a platform window and renders into it through wgpu.
    pub fn windowed(config: SystemConfig) -> Result<Self, EngineError> {
        if INITIALIZED.load(Ordering::Acquire) {
            return Err(EngineError::AlreadyInitialized);
        }

        let window = WinitWindow::open(config.window_settings()).map_err(EngineError::Window)?;
        let init = config.gpu.clone();

        Self::initialize(config, window, move |w| {
            let handle = w.handle().context("window closed before GPU initialization")?;
            let gpu = pollster::block_on(Gpu::new(handle, init))?;
            Ok(WgpuApi::new(gpu)?)
        })
    }
}

impl<G: GraphicsApi, W: WindowSystem> RenderSystem<G, W> {
    /// Claims the process-wide slot and brings the system up over `window`.
    ///
    /// `connect` creates the graphics backend for the window.
    pub fn initialize(
        config: SystemConfig,
        window: W,
        connect: impl FnOnce(&W) -> anyhow::Result<G>,
    ) -> Result<Self, EngineError> {
        if INITIALIZED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::AlreadyInitialized);
        }

        if let Some(logging) = config.logging.clone() {
            init_logging(logging);
        }

        let gpu = match connect(&window) {
            Ok(gpu) => gpu,
            Err(e) => {
                INITIALIZED.store(false, Ordering::Release);
                return Err(EngineError::Graphics(e));
            }
        };

        let screen_size = gpu.screen_extent();
        let mut screen = BatchRenderer::new(View::pixels(screen_size));
        screen.set_clear_color(config.clear_color);

        let mut system = Self {
            gpu,
            window,
            resources: ResourceManager::new(),
            decoder: Box::new(ImageCrateDecoder),
            factory: GeometryFactory::new(),
            screen,
            nodes: Vec::new(),
            font: None,
            clock: FrameClock::new(),
            screen_size,
            config,
            memory_textures: 0,
            last_stats: BatchStats::default(),
            quit: false,
        };

        let px_size = system.config.font_size;
        let custom = system.config.font.clone().map(|path| {
            std::fs::read(&path)
                .map_err(|e| FontLoadError(format!("{}: {e}", path.display())))
                .and_then(|bytes| system.load_font(&bytes, px_size))
        });
        match custom {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                log::warn!("configured font unavailable, using the built-in one: {e}");
                system.load_default_font(px_size);
            }
            None => system.load_default_font(px_size),
        }

        log::info!(
            "render system initialized ({}x{})",
            system.screen_size.width,
            system.screen_size.height
        );
        Ok(system)
    }

    /// Whether a render system currently exists in this process.
    pub fn is_initialized() -> bool {
        INITIALIZED.load(Ordering::Acquire)
    }

    /// Runs one frame. Returns `false` once shutdown was requested.
    pub fn run_frame(&mut self) -> bool {
        if self.quit {
            return false;
        }

        for event in self.window.poll_events() {
            self.handle_event(event);
        }
        if self.quit {
            self.window.close();
            return false;
        }

        let released = self.resources.clean(&mut self.gpu);
        if released > 0 {
            log::debug!("released {released} unreferenced resources");
        }

        let time = self.clock.tick();
        for node in &mut self.nodes {
            node.pre_render(&self.factory, &mut self.screen, &time);
        }

        self.last_stats = self.screen.draw(&mut self.gpu, true);

        match self.gpu.present() {
            PresentStatus::Presented | PresentStatus::Skipped => true,
            PresentStatus::Fatal => {
                log::error!("presentation failed fatally; shutting down");
                self.quit = true;
                false
            }
        }
    }

    fn handle_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::Close | WindowEvent::Key { key: Key::Escape, pressed: true } => {
                self.quit = true;
            }
            WindowEvent::Key { .. } => {}
            WindowEvent::Resize(size) => {
                if size == self.screen_size {
                    return;
                }
                if !self.config.resizable {
                    log::debug!("resize to {}x{} reverted", size.width, size.height);
                    self.window.set_size(self.screen_size);
                    return;
                }
                self.screen_size = size;
                self.gpu.resize_screen(size);
                self.screen.set_view(View::pixels(size));
            }
        }
    }

    /// Stops the frame loop at the next [`run_frame`](Self::run_frame).
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    fn default_filter(&self, linear: bool) -> FilterMode {
        FilterMode::from_linear(linear || self.config.linear_filtering)
    }

    fn register(&self, texture: Texture) -> Arc<Texture> {
        if texture.is_failed() {
            return Arc::new(texture);
        }
        self.resources.add_texture(texture)
    }

    /// Loads and decodes an image file. Failures yield the placeholder texture.
    ///
    /// A file already loaded under the same path is shared.
    pub fn load_texture_from_file(&mut self, path: impl AsRef<Path>, linear: bool) -> Arc<Texture> {
        let path = path.as_ref();
        let name = path.display().to_string();
        if let Some(existing) = self.resources.find_texture(&name) {
            return existing;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to read texture '{name}': {e}");
                return Arc::new(Texture::failed());
            }
        };

        let image = self.decoder.decode(&bytes);
        if image.is_empty() {
            log::warn!("failed to decode texture '{name}'");
            return Arc::new(Texture::failed());
        }

        let filter = self.default_filter(linear);
        let texture = Texture::from_pixels(&mut self.gpu, name, image.extent, &image.pixels, filter);
        self.register(texture)
    }

    /// Creates a texture from encoded image bytes or raw RGBA8 of exactly
    /// `width * height * 4` bytes.
    pub fn load_texture_from_memory(&mut self, bytes: &[u8], width: u32, height: u32, linear: bool) -> Arc<Texture> {
        let extent = Extent::new(width, height);
        let pixels = self.decoder.decode_sized(bytes, extent);
        if pixels.is_empty() {
            log::warn!("failed to load {width}x{height} texture from memory");
            return Arc::new(Texture::failed());
        }

        self.memory_textures += 1;
        let name = format!("memory texture {}", self.memory_textures);
        let filter = self.default_filter(linear);
        let texture = Texture::from_pixels(&mut self.gpu, name, extent, &pixels, filter);
        self.register(texture)
    }

    /// Creates an off-screen target. Failures yield an invalid target that is
    /// never drawn into.
    pub fn create_render_target(&mut self, size: Extent, linear: bool) -> Arc<RenderTarget> {
        let filter = self.default_filter(linear);
        let target = RenderTarget::new(&mut self.gpu, size, filter);
        if !target.is_valid() {
            return Arc::new(target);
        }
        self.resources.add_render_target(target)
    }

    pub fn find_texture(&self, name: &str) -> Option<Arc<Texture>> {
        self.resources.find_texture(name)
    }

    pub fn find_texture_by_id(&self, id: TextureId) -> Option<Arc<Texture>> {
        self.resources.find_texture_by_id(id)
    }

    /// Replaces the font used by [`draw_text`](Self::draw_text).
    pub fn load_font(&mut self, bytes: &[u8], px_size: f32) -> Result<(), FontLoadError> {
        let font = BitmapFont::from_bytes(&mut self.gpu, bytes, px_size)?;
        self.install_font(font);
        Ok(())
    }

    fn load_default_font(&mut self, px_size: f32) {
        match BitmapFont::builtin(&mut self.gpu, px_size) {
            Ok(font) => self.install_font(font),
            Err(e) => log::warn!("built-in font unavailable: {e}"),
        }
    }

    fn install_font(&mut self, font: BitmapFont) {
        self.resources.add(Resource::Texture(font.texture().clone()));
        self.font = Some(font);
    }

    /// Font used by [`draw_text`](Self::draw_text); the built-in one unless
    /// replaced.
    pub fn font(&self) -> Option<&BitmapFont> {
        self.font.as_ref()
    }

    /// Queues a text run on the screen with the factory depth and group.
    ///
    /// Returns `None` only if no font could be baked at startup.
    pub fn draw_text(&mut self, text: &str, position: Vec2, color: Color) -> Option<GeometryId> {
        let Some(font) = &self.font else {
            log::warn!("draw_text called without a loaded font");
            return None;
        };

        let mut geometry = font.text_geometry(text, position, color);
        geometry.set_immediate(true);
        self.factory.apply(
            &mut geometry,
            ApplyFlags { texture: false, update: false, ..ApplyFlags::ALL },
        );
        Some(self.screen.add(geometry))
    }

    pub fn draw_rectangle(&mut self, rect: Rect, color: Color) -> GeometryId {
        self.factory.draw_rectangle(&mut self.screen, rect, color)
    }

    pub fn draw_texture(&mut self, texture: &Arc<Texture>, position: Vec2) -> GeometryId {
        self.factory.draw_texture(&mut self.screen, texture, position)
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.screen.set_clear_color(color);
    }

    pub fn add_node(&mut self, node: Box<dyn SceneNode>) {
        self.nodes.push(node);
    }

    /// Smoothed frames per second.
    pub fn framerate(&self) -> f32 {
        self.clock.framerate()
    }

    pub fn screen_size(&self) -> Extent {
        self.screen_size
    }

    /// Counters of the last screen batch.
    pub fn last_stats(&self) -> BatchStats {
        self.last_stats
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut G {
        &mut self.gpu
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn factory(&self) -> &GeometryFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut GeometryFactory {
        &mut self.factory
    }

    pub fn screen(&self) -> &BatchRenderer {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut BatchRenderer {
        &mut self.screen
    }

    /// Replaces the image decoder used by the texture loaders.
    pub fn set_decoder(&mut self, decoder: Box<dyn ImageDecoder>) {
        self.decoder = decoder;
    }

    /// Draws `renderer` into its bound target (or the screen) with this system's backend.
    pub fn draw_batch(&mut self, renderer: &mut BatchRenderer, clear: bool) -> BatchStats {
        renderer.draw(&mut self.gpu, clear)
    }
}

impl<G: GraphicsApi, W: WindowSystem> Drop for RenderSystem<G, W> {
    fn drop(&mut self) {
        self.screen.clear();
        self.font = None;
        self.resources.release_all(&mut self.gpu);
        INITIALIZED.store(false, Ordering::Release);
        log::info!("render system shut down");
    }
}
