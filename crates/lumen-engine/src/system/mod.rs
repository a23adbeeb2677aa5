//! Render system boundary: owns the window, the GPU backend, the resource
//! manager and the screen batch, and drives the frame loop.

mod config;
mod render_system;

pub use config::SystemConfig;
pub use render_system::RenderSystem;
