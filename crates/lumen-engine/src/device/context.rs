use std::sync::Arc;

use anyhow::{Context, Result};
use winit::window::Window;

use crate::coords::Extent;
use crate::gfx::PresentStatus;

use super::{surface, GpuInit};

/// Screen image acquired for the current frame.
///
/// Held from the first screen pass until present; while it is alive the next
/// swapchain image cannot be acquired.
pub struct ScreenFrame {
    pub view: wgpu::TextureView,
    texture: wgpu::SurfaceTexture,
}

impl ScreenFrame {
    pub fn present(self) {
        let Self { view, texture } = self;
        drop(view);
        texture.present();
    }
}

/// wgpu device, queue and the window surface the screen is presented to.
pub struct Gpu {
    /// Kept alive for the lifetime of the surface.
    _instance: wgpu::Instance,
    /// Created from an `Arc<Window>`, which keeps the window alive, hence `'static`.
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Drawable size in physical pixels; may be zero while minimized.
    extent: Extent,
}

impl Gpu {
    /// Creates the device and configures the window surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        let extent = Extent::new(size.width, size.height);
        anyhow::ensure!(!extent.is_empty(), "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;
        log::info!("using GPU adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("lumen device"),
                required_features: wgpu::Features::empty(),
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: extent.width,
            height: extent.height,
            present_mode: init.present_mode(),
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);
        log::debug!("screen surface {format:?}, {:?}, {}x{}", config.present_mode, extent.width, extent.height);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            extent,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Largest width or height accepted for textures and render targets.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the surface. A zero extent is only recorded.
    pub fn resize(&mut self, extent: Extent) {
        self.extent = extent;
        if extent.is_empty() {
            return;
        }
        self.config.width = extent.width;
        self.config.height = extent.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquires the next screen image.
    ///
    /// On failure the surface is repaired where possible and the returned
    /// status says whether the frame loop can continue.
    pub fn acquire_frame(&mut self) -> Result<ScreenFrame, PresentStatus> {
        if self.extent.is_empty() {
            return Err(PresentStatus::Skipped);
        }
        match self.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
                Ok(ScreenFrame { view, texture })
            }
            Err(err) => {
                log::warn!("failed to acquire screen image: {err}");
                Err(surface::recover(&self.surface, &self.device, &self.config, err))
            }
        }
    }
}
