use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::coords::Extent;
use crate::gfx::{FilterMode, FramebufferId, GraphicsApi};

use super::Texture;

/// An off-screen draw destination backed by an ordinary [`Texture`].
///
/// The framebuffer and the texture share the extent given at construction;
/// render targets are never resized.
#[derive(Debug)]
pub struct RenderTarget {
    texture: Arc<Texture>,
    framebuffer: FramebufferId,
    bound: AtomicBool,
}

impl RenderTarget {
    /// Allocates a transparent texture of `extent` and a framebuffer over it.
    ///
    /// On failure the target carries the failed placeholder texture and
    /// `FramebufferId::NONE`; renderers skip drawing into it.
    pub fn new(gpu: &mut dyn GraphicsApi, extent: Extent, filter: FilterMode) -> Self {
        let name = format!("render target {}x{}", extent.width, extent.height);
        let texture = Texture::empty(gpu, name, extent, filter);
        if texture.is_failed() {
            return Self::invalid(texture);
        }

        match gpu.create_framebuffer(texture.texture_id()) {
            Ok(framebuffer) => Self {
                texture: Arc::new(texture),
                framebuffer,
                bound: AtomicBool::new(false),
            },
            Err(err) => {
                log::warn!("{}: framebuffer creation failed: {err}", texture.name());
                gpu.delete_texture(texture.texture_id());
                Self::invalid(Texture::failed())
            }
        }
    }

    fn invalid(texture: Texture) -> Self {
        Self {
            texture: Arc::new(texture),
            framebuffer: FramebufferId::NONE,
            bound: AtomicBool::new(false),
        }
    }

    /// Backing texture, usable as a source by any geometry.
    #[inline]
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    #[inline]
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    #[inline]
    pub fn size(&self) -> Extent {
        self.texture.size()
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.framebuffer.is_none()
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    /// Claims the target for one renderer. Returns `false` if it is already bound.
    pub(crate) fn try_bind(&self) -> bool {
        self.bound
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn unbind(&self) {
        self.bound.store(false, Ordering::Release);
    }
}
