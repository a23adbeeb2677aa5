use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent as WinitEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowId};

use crate::coords::Extent;

use super::{Key, WindowEvent, WindowSystem};

/// Attributes of the platform window.
#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub size: Extent,
    /// Borderless fullscreen on the current monitor.
    pub fullscreen: bool,
    pub resizable: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "lumen".to_string(),
            size: Extent::new(1280, 720),
            fullscreen: false,
            resizable: true,
        }
    }
}

/// Attempts to pump the loop before giving up on the first window.
const OPEN_ATTEMPTS: usize = 100;

struct Handler {
    settings: WindowSettings,
    window: Option<Arc<Window>>,
    events: Vec<WindowEvent>,
    error: Option<anyhow::Error>,
}

impl Handler {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let s = &self.settings;
        let mut attrs = Window::default_attributes()
            .with_title(s.title.clone())
            .with_inner_size(PhysicalSize::new(s.size.width.max(1), s.size.height.max(1)))
            .with_resizable(s.resizable);
        if s.fullscreen {
            attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;
        Ok(Arc::new(window))
    }
}

impl ApplicationHandler for Handler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match self.create_window(event_loop) {
            Ok(window) => self.window = Some(window),
            Err(e) => {
                log::error!("{e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _window_id: WindowId, event: WinitEvent) {
        match event {
            WinitEvent::CloseRequested | WinitEvent::Destroyed => self.events.push(WindowEvent::Close),

            WinitEvent::Resized(size) => {
                self.events.push(WindowEvent::Resize(Extent::new(size.width, size.height)));
            }

            WinitEvent::KeyboardInput { event, .. } => {
                self.events.push(WindowEvent::Key {
                    key: map_key(event.physical_key),
                    pressed: event.state == ElementState::Pressed,
                });
            }

            _ => {}
        }
    }
}

/// Platform window driven by `pump_app_events`, so the frame loop stays a
/// plain blocking loop owned by the caller.
pub struct WinitWindow {
    event_loop: EventLoop<()>,
    handler: Handler,
    exited: bool,
}

impl WinitWindow {
    /// Creates the event loop and pumps it until the window exists.
    pub fn open(settings: WindowSettings) -> Result<Self> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut this = Self {
            event_loop,
            handler: Handler {
                settings,
                window: None,
                events: Vec::new(),
                error: None,
            },
            exited: false,
        };

        for _ in 0..OPEN_ATTEMPTS {
            this.pump();
            if let Some(e) = this.handler.error.take() {
                return Err(e);
            }
            if this.handler.window.is_some() {
                return Ok(this);
            }
            if this.exited {
                break;
            }
        }
        anyhow::bail!("event loop did not produce a window")
    }

    /// Shared handle for surface creation.
    pub fn handle(&self) -> Option<Arc<Window>> {
        self.handler.window.clone()
    }

    fn pump(&mut self) {
        if self.exited {
            return;
        }
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.handler)
        {
            log::debug!("event loop exited with code {code}");
            self.exited = true;
            self.handler.events.push(WindowEvent::Close);
        }
    }
}

impl WindowSystem for WinitWindow {
    fn poll_events(&mut self) -> Vec<WindowEvent> {
        self.pump();
        std::mem::take(&mut self.handler.events)
    }

    fn size(&self) -> Extent {
        self.handler.window.as_ref().map_or(Extent::zero(), |w| {
            let size = w.inner_size();
            Extent::new(size.width, size.height)
        })
    }

    fn set_size(&mut self, size: Extent) {
        if let Some(window) = &self.handler.window {
            // `None` means the resize is applied asynchronously and reported as an event.
            let _ = window.request_inner_size(PhysicalSize::new(size.width, size.height));
        }
    }

    fn close(&mut self) {
        self.handler.window = None;
        self.handler.events.clear();
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    match pk {
        PhysicalKey::Code(code) => match code {
            KeyCode::Escape => Key::Escape,
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Space => Key::Space,

            KeyCode::ArrowUp => Key::ArrowUp,
            KeyCode::ArrowDown => Key::ArrowDown,
            KeyCode::ArrowLeft => Key::ArrowLeft,
            KeyCode::ArrowRight => Key::ArrowRight,

            KeyCode::KeyA => Key::A,
            KeyCode::KeyB => Key::B,
            KeyCode::KeyC => Key::C,
            KeyCode::KeyD => Key::D,
            KeyCode::KeyE => Key::E,
            KeyCode::KeyF => Key::F,
            KeyCode::KeyG => Key::G,
            KeyCode::KeyH => Key::H,
            KeyCode::KeyI => Key::I,
            KeyCode::KeyJ => Key::J,
            KeyCode::KeyK => Key::K,
            KeyCode::KeyL => Key::L,
            KeyCode::KeyM => Key::M,
            KeyCode::KeyN => Key::N,
            KeyCode::KeyO => Key::O,
            KeyCode::KeyP => Key::P,
            KeyCode::KeyQ => Key::Q,
            KeyCode::KeyR => Key::R,
            KeyCode::KeyS => Key::S,
            KeyCode::KeyT => Key::T,
            KeyCode::KeyU => Key::U,
            KeyCode::KeyV => Key::V,
            KeyCode::KeyW => Key::W,
            KeyCode::KeyX => Key::X,
            KeyCode::KeyY => Key::Y,
            KeyCode::KeyZ => Key::Z,

            KeyCode::Digit0 => Key::Digit0,
            KeyCode::Digit1 => Key::Digit1,
            KeyCode::Digit2 => Key::Digit2,
            KeyCode::Digit3 => Key::Digit3,
            KeyCode::Digit4 => Key::Digit4,
            KeyCode::Digit5 => Key::Digit5,
            KeyCode::Digit6 => Key::Digit6,
            KeyCode::Digit7 => Key::Digit7,
            KeyCode::Digit8 => Key::Digit8,
            KeyCode::Digit9 => Key::Digit9,

            KeyCode::F1 => Key::F1,
            KeyCode::F2 => Key::F2,
            KeyCode::F3 => Key::F3,
            KeyCode::F4 => Key::F4,
            KeyCode::F5 => Key::F5,
            KeyCode::F6 => Key::F6,
            KeyCode::F7 => Key::F7,
            KeyCode::F8 => Key::F8,
            KeyCode::F9 => Key::F9,
            KeyCode::F10 => Key::F10,
            KeyCode::F11 => Key::F11,
            KeyCode::F12 => Key::F12,

            other => Key::Unknown(other as u32),
        },

        // winit 0.30 uses NativeKeyCode; no stable numeric is guaranteed here.
        PhysicalKey::Unidentified(_) => Key::Unknown(0),
    }
}
