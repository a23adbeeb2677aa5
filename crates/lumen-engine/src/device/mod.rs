//! wgpu device and window surface ownership for [`crate::gfx::WgpuApi`].

mod context;
mod init;
mod surface;

pub use context::{Gpu, ScreenFrame};
pub use init::GpuInit;
