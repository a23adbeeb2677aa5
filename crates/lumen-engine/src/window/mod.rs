//! Window/event collaborators.
//!
//! The render system only needs a size, a way to restore it and a stream of
//! [`WindowEvent`]s. [`WinitWindow`] provides them from a real platform
//! window; [`HeadlessWindow`] from a script.

mod event;
mod headless;
mod winit_window;

pub use event::{Key, WindowEvent};
pub use headless::HeadlessWindow;
pub use winit_window::{WindowSettings, WinitWindow};

use crate::coords::Extent;

/// Platform window as seen by the frame loop.
pub trait WindowSystem {
    /// Returns every event received since the previous call. Never blocks.
    fn poll_events(&mut self) -> Vec<WindowEvent>;

    /// Drawable size in physical pixels.
    fn size(&self) -> Extent;

    fn set_size(&mut self, size: Extent);

    fn close(&mut self);
}
