use crate::coords::Extent;

/// Decoded RGBA8 pixels. An empty image signals a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub extent: Extent,
}

impl DecodedImage {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty() || self.extent.is_empty()
    }
}

/// Turns encoded image bytes into RGBA8 pixels.
///
/// Implementations never fail loudly: undecodable input yields an empty result.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> DecodedImage;

    /// Decodes `bytes` expecting an image of exactly `extent`.
    fn decode_sized(&self, bytes: &[u8], extent: Extent) -> Vec<u8>;
}

/// [`ImageDecoder`] backed by the `image` crate (PNG, JPEG, BMP, GIF, TGA).
#[derive(Debug, Default, Copy, Clone)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> DecodedImage {
        match image::load_from_memory(bytes) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let (width, height) = rgba.dimensions();
                DecodedImage {
                    pixels: rgba.into_raw(),
                    extent: Extent::new(width, height),
                }
            }
            Err(err) => {
                log::warn!("image decode failed: {err}");
                DecodedImage::default()
            }
        }
    }

    /// Raw RGBA8 input of exactly `extent.area() * 4` bytes is taken as is.
    fn decode_sized(&self, bytes: &[u8], extent: Extent) -> Vec<u8> {
        if !extent.is_empty() && bytes.len() == extent.area() * 4 {
            return bytes.to_vec();
        }

        let decoded = self.decode(bytes);
        if decoded.is_empty() {
            return Vec::new();
        }
        if decoded.extent != extent {
            log::warn!(
                "decoded image is {}x{}, expected {}x{}",
                decoded.extent.width,
                decoded.extent.height,
                extent.width,
                extent.height
            );
            return Vec::new();
        }
        decoded.pixels
    }
}
