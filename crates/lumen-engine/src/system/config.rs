use std::path::PathBuf;

use crate::coords::Extent;
use crate::device::GpuInit;
use crate::logging::LoggingConfig;
use crate::paint::Color;
use crate::window::WindowSettings;

/// Render system configuration.
#[derive(Debug, Clone)]
pub struct SystemConfig {
    pub title: String,
    pub screen_size: Extent,
    pub fullscreen: bool,
    /// When `false`, user resizes are reverted to `screen_size`.
    pub resizable: bool,
    pub clear_color: Color,
    /// Default filtering for loaded textures and render targets.
    pub linear_filtering: bool,

    /// Font baked at startup for `draw_text` in place of the built-in one.
    pub font: Option<PathBuf>,
    pub font_size: f32,

    pub gpu: GpuInit,
    /// Installs the global logger during initialization when set.
    pub logging: Option<LoggingConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            screen_size: Extent::new(1280, 720),
            fullscreen: false,
            resizable: true,
            clear_color: Color::BLACK,
            linear_filtering: false,
            font: None,
            font_size: 16.0,
            gpu: GpuInit::default(),
            logging: None,
        }
    }
}

impl SystemConfig {
    pub fn window_settings(&self) -> WindowSettings {
        WindowSettings {
            title: self.title.clone(),
            size: self.screen_size,
            fullscreen: self.fullscreen,
            resizable: self.resizable,
        }
    }
}
