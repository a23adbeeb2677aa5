use parking_lot::Mutex;

use crate::coords::Extent;
use crate::error::PixelError;
use crate::gfx::{FilterMode, GraphicsApi, TextureId};
use crate::paint::Color;

/// Name carried by every placeholder produced for a failed load.
pub const FAILED_TEXTURE_NAME: &str = "FAILED TO LOAD";

/// A GPU image plus an optional CPU-side pixel cache.
///
/// The cache only exists between [`lock`](Self::lock) and [`unlock`](Self::unlock).
/// Pixels are RGBA8, row-major, top row first. Changes reach the GPU on unlock.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    extent: Extent,
    name: String,
    filter: FilterMode,
    cache: Mutex<Option<Vec<u8>>>,
}

impl Texture {
    /// Uploads `pixels` into a new GPU texture.
    ///
    /// Never fails: a zero extent, a pixel buffer of the wrong length or a
    /// backend error yields the [`failed`](Self::failed) placeholder.
    pub fn from_pixels(
        gpu: &mut dyn GraphicsApi,
        name: impl Into<String>,
        extent: Extent,
        pixels: &[u8],
        filter: FilterMode,
    ) -> Self {
        let name = name.into();
        if pixels.len() != extent.area() * 4 {
            log::warn!(
                "texture '{name}': {} bytes of pixel data for {}x{}",
                pixels.len(),
                extent.width,
                extent.height
            );
            return Self::failed();
        }
        Self::create(gpu, name, extent, Some(pixels), filter)
    }

    /// Creates a transparent texture of the given size.
    pub fn empty(
        gpu: &mut dyn GraphicsApi,
        name: impl Into<String>,
        extent: Extent,
        filter: FilterMode,
    ) -> Self {
        Self::create(gpu, name.into(), extent, None, filter)
    }

    fn create(
        gpu: &mut dyn GraphicsApi,
        name: String,
        extent: Extent,
        pixels: Option<&[u8]>,
        filter: FilterMode,
    ) -> Self {
        if extent.is_empty() {
            log::warn!("texture '{name}': zero-sized ({}x{})", extent.width, extent.height);
            return Self::failed();
        }
        match gpu.create_texture(extent, pixels, filter) {
            Ok(id) => {
                log::debug!("texture '{name}' created as {} ({}x{})", id.0, extent.width, extent.height);
                Self::from_parts(id, extent, name, filter)
            }
            Err(err) => {
                log::warn!("texture '{name}': {err}");
                Self::failed()
            }
        }
    }

    /// Zero-sized placeholder returned for every failed load.
    pub fn failed() -> Self {
        Self::from_parts(TextureId::NONE, Extent::zero(), FAILED_TEXTURE_NAME.to_string(), FilterMode::Nearest)
    }

    pub(crate) fn from_parts(id: TextureId, extent: Extent, name: String, filter: FilterMode) -> Self {
        Self {
            id,
            extent,
            name,
            filter,
            cache: Mutex::new(None),
        }
    }

    #[inline]
    pub fn texture_id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> Extent {
        self.extent
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    /// `true` for placeholders that never reached the GPU.
    #[inline]
    pub fn is_failed(&self) -> bool {
        self.id.is_none()
    }

    pub fn is_locked(&self) -> bool {
        self.cache.lock().is_some()
    }

    /// Fills the CPU cache from the GPU and returns whether the texture is now
    /// locked by this call.
    ///
    /// Locking twice is a warning no-op. A failed readback also leaves the
    /// texture unlocked, so a later `unlock` cannot overwrite the GPU copy.
    pub fn lock(&self, gpu: &mut dyn GraphicsApi) -> bool {
        let mut cache = self.cache.lock();
        if cache.is_some() {
            log::warn!("texture '{}' is already locked", self.name);
            return false;
        }

        let pixels = if self.id.is_none() {
            Vec::new()
        } else {
            match gpu.read_texture(self.id) {
                Ok(pixels) => pixels,
                Err(err) => {
                    log::warn!("texture '{}' not locked, readback failed: {err}", self.name);
                    return false;
                }
            }
        };
        *cache = Some(pixels);
        true
    }

    /// Uploads the CPU cache to the GPU and releases it.
    pub fn unlock(&self, gpu: &mut dyn GraphicsApi) {
        let Some(pixels) = self.cache.lock().take() else {
            log::warn!("texture '{}' unlocked while not locked", self.name);
            return;
        };
        if self.id.is_none() {
            return;
        }
        if let Err(err) = gpu.upload_texture(self.id, &pixels) {
            log::error!("texture '{}': upload failed: {err}", self.name);
        }
    }

    /// Locks the texture for the lifetime of the returned guard.
    ///
    /// Returns `None` when the texture is already locked or cannot be read back.
    pub fn lock_scoped<'a>(&'a self, gpu: &'a mut dyn GraphicsApi) -> Option<PixelLock<'a>> {
        if !self.lock(gpu) {
            return None;
        }
        Some(PixelLock { texture: self, gpu })
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Result<Color, PixelError> {
        let cache = self.cache.lock();
        let pixels = cache.as_ref().ok_or(PixelError::NotLocked)?;
        let i = self.offset(x, y)?;
        Ok(Color::new(pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]))
    }

    pub fn set_pixel(&self, x: u32, y: u32, color: Color) -> Result<(), PixelError> {
        let mut cache = self.cache.lock();
        let pixels = cache.as_mut().ok_or(PixelError::NotLocked)?;
        let i = self.offset(x, y)?;
        pixels[i..i + 4].copy_from_slice(&color.to_array());
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> Result<usize, PixelError> {
        if !self.extent.contains(x, y) {
            return Err(PixelError::OutOfBounds {
                x,
                y,
                width: self.extent.width,
                height: self.extent.height,
            });
        }
        Ok((y as usize * self.extent.width as usize + x as usize) * 4)
    }
}

/// Scoped pixel access; unlocks (and uploads) the texture on drop.
pub struct PixelLock<'a> {
    texture: &'a Texture,
    gpu: &'a mut dyn GraphicsApi,
}

impl PixelLock<'_> {
    pub fn texture(&self) -> &Texture {
        self.texture
    }

    pub fn size(&self) -> Extent {
        self.texture.size()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Result<Color, PixelError> {
        self.texture.get_pixel(x, y)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> Result<(), PixelError> {
        self.texture.set_pixel(x, y, color)
    }

    /// Overwrites every pixel with `color`.
    pub fn fill(&mut self, color: Color) {
        if let Some(pixels) = self.texture.cache.lock().as_mut() {
            let rgba = color.to_array();
            for px in pixels.chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
    }
}

impl Drop for PixelLock<'_> {
    fn drop(&mut self) {
        self.texture.unlock(self.gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GfxError;
    use crate::gfx::{BlendMode, FramebufferId, GpuVertex, PresentStatus, Projection, SoftwareApi};

    fn checker(gpu: &mut SoftwareApi) -> Texture {
        let mut pixels = Vec::new();
        for i in 0..4u8 {
            pixels.extend_from_slice(&[i * 10, i * 20, i * 30, 255]);
        }
        Texture::from_pixels(gpu, "checker", Extent::new(2, 2), &pixels, FilterMode::Nearest)
    }

    #[test]
    fn pixels_are_only_accessible_while_locked() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let tex = checker(&mut gpu);

        assert_eq!(tex.get_pixel(0, 0), Err(PixelError::NotLocked));
        assert_eq!(tex.set_pixel(0, 0, Color::RED), Err(PixelError::NotLocked));

        tex.lock(&mut gpu);
        assert_eq!(tex.get_pixel(1, 0), Ok(Color::new(10, 20, 30, 255)));
        tex.set_pixel(1, 1, Color::GREEN).unwrap();
        assert_eq!(tex.get_pixel(1, 1), Ok(Color::GREEN));
        tex.unlock(&mut gpu);

        assert!(!tex.is_locked());
        tex.lock(&mut gpu);
        assert_eq!(tex.get_pixel(1, 1), Ok(Color::GREEN));
        tex.unlock(&mut gpu);
    }

    #[test]
    fn out_of_bounds_access_is_reported() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let tex = checker(&mut gpu);
        tex.lock(&mut gpu);
        assert_eq!(
            tex.get_pixel(2, 0),
            Err(PixelError::OutOfBounds { x: 2, y: 0, width: 2, height: 2 })
        );
        assert!(tex.set_pixel(0, 5, Color::RED).is_err());
        tex.unlock(&mut gpu);
    }

    #[test]
    fn lock_unlock_without_changes_keeps_contents() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let tex = checker(&mut gpu);
        let before = gpu.read_texture(tex.texture_id()).unwrap();

        tex.lock(&mut gpu);
        tex.unlock(&mut gpu);

        assert_eq!(gpu.read_texture(tex.texture_id()).unwrap(), before);
    }

    #[test]
    fn scoped_lock_unlocks_on_drop() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let tex = Texture::empty(&mut gpu, "blank", Extent::new(3, 3), FilterMode::Nearest);
        {
            let mut px = tex.lock_scoped(&mut gpu).unwrap();
            px.fill(Color::BLUE);
            px.set_pixel(2, 2, Color::RED).unwrap();
        }
        assert!(!tex.is_locked());

        let data = gpu.read_texture(tex.texture_id()).unwrap();
        assert_eq!(&data[0..4], &Color::BLUE.to_array());
        assert_eq!(&data[32..36], &Color::RED.to_array());
    }

    #[test]
    fn second_scoped_lock_is_refused() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let tex = checker(&mut gpu);
        tex.lock(&mut gpu);
        assert!(tex.lock_scoped(&mut gpu).is_none());
        tex.unlock(&mut gpu);
    }

    #[test]
    fn bad_input_yields_placeholder() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let short = Texture::from_pixels(&mut gpu, "short", Extent::new(4, 4), &[0; 8], FilterMode::Nearest);
        assert!(short.is_failed());
        assert_eq!(short.name(), FAILED_TEXTURE_NAME);
        assert_eq!(short.size(), Extent::zero());

        let zero = Texture::empty(&mut gpu, "zero", Extent::new(0, 16), FilterMode::Linear);
        assert!(zero.is_failed());
        assert_eq!(gpu.texture_count(), 0);
    }

    /// Backend whose readback always fails; records uploads.
    #[derive(Default)]
    struct NoReadback {
        uploads: Vec<Vec<u8>>,
    }

    impl GraphicsApi for NoReadback {
        fn create_texture(&mut self, _: Extent, _: Option<&[u8]>, _: FilterMode) -> Result<TextureId, GfxError> {
            Ok(TextureId(3))
        }
        fn upload_texture(&mut self, _: TextureId, pixels: &[u8]) -> Result<(), GfxError> {
            self.uploads.push(pixels.to_vec());
            Ok(())
        }
        fn read_texture(&mut self, _: TextureId) -> Result<Vec<u8>, GfxError> {
            Err(GfxError::Backend("device lost".into()))
        }
        fn delete_texture(&mut self, _: TextureId) {}
        fn create_framebuffer(&mut self, _: TextureId) -> Result<FramebufferId, GfxError> {
            Ok(FramebufferId(1))
        }
        fn delete_framebuffer(&mut self, _: FramebufferId) {}
        fn begin_pass(&mut self, _: Option<FramebufferId>, _: Projection, _: Option<Color>) {}
        fn set_blend_mode(&mut self, _: BlendMode) {}
        fn bind_texture(&mut self, _: Option<TextureId>) {}
        fn draw_triangles(&mut self, _: &[GpuVertex]) {}
        fn end_pass(&mut self) {}
        fn screen_extent(&self) -> Extent {
            Extent::new(1, 1)
        }
        fn resize_screen(&mut self, _: Extent) {}
        fn present(&mut self) -> PresentStatus {
            PresentStatus::Presented
        }
    }

    #[test]
    fn failed_readback_leaves_texture_untouched() {
        let mut gpu = NoReadback::default();
        let tex = Texture::from_pixels(&mut gpu, "white", Extent::new(2, 1), &[255; 8], FilterMode::Nearest);

        assert!(!tex.lock(&mut gpu));
        assert!(!tex.is_locked());
        assert_eq!(tex.get_pixel(0, 0), Err(PixelError::NotLocked));
        tex.unlock(&mut gpu);
        assert!(tex.lock_scoped(&mut gpu).is_none());

        assert!(gpu.uploads.is_empty());
    }

    #[test]
    fn placeholder_lock_is_empty() {
        let mut gpu = SoftwareApi::new(Extent::new(8, 8));
        let tex = Texture::failed();
        tex.lock(&mut gpu);
        assert!(matches!(tex.get_pixel(0, 0), Err(PixelError::OutOfBounds { .. })));
        tex.unlock(&mut gpu);
    }
}
