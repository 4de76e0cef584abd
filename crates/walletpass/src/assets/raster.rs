//! Rasterization of branding images into pass asset variants.
//!
//! [`ImageBackend`] is the seam between the pipeline and the image library.
//! [`RasterBackend`] is the default implementation; it is constructed
//! explicitly and handed to [`AssetPipeline`](super::AssetPipeline), so there
//! is no lazily initialised global image handle.

use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::Cursor;

/// Decoding and rendering of square PNG variants.
pub trait ImageBackend: Send + Sync {
    /// Decode `bytes` and apply any embedded orientation metadata.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage>;

    /// Fit `image` inside a `size_px` square without cropping, padding the
    /// uncovered axis with transparent pixels. Returns PNG bytes.
    fn contain(&self, image: &DynamicImage, size_px: u32) -> Result<Vec<u8>>;

    /// Crop `image` to fill a `size_px` square and keep only the inscribed
    /// circle opaque. Returns PNG bytes.
    fn circle(&self, image: &DynamicImage, size_px: u32) -> Result<Vec<u8>>;
}

/// Default [`ImageBackend`] built on the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct RasterBackend {
    filter: FilterType,
}

impl RasterBackend {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Use a different resampling filter.
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RasterBackend {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| Error::Image(format!("Failed to read image: {}", e)))?
            .into_decoder()
            .map_err(|e| Error::Image(format!("Unsupported image: {}", e)))?;
        let orientation = decoder
            .orientation()
            .map_err(|e| Error::Image(format!("Failed to read orientation: {}", e)))?;
        let mut image = DynamicImage::from_decoder(decoder)
            .map_err(|e| Error::Image(format!("Failed to decode image: {}", e)))?;
        image.apply_orientation(orientation);
        Ok(image)
    }

    fn contain(&self, image: &DynamicImage, size_px: u32) -> Result<Vec<u8>> {
        check_size(size_px)?;
        let fitted = image.resize(size_px, size_px, self.filter).to_rgba8();

        let mut canvas = RgbaImage::from_pixel(size_px, size_px, Rgba([0, 0, 0, 0]));
        let x = (size_px - fitted.width().min(size_px)) / 2;
        let y = (size_px - fitted.height().min(size_px)) / 2;
        imageops::overlay(&mut canvas, &fitted, i64::from(x), i64::from(y));

        encode_png(canvas)
    }

    fn circle(&self, image: &DynamicImage, size_px: u32) -> Result<Vec<u8>> {
        check_size(size_px)?;
        let mut filled = image.resize_to_fill(size_px, size_px, self.filter).to_rgba8();

        // Destination-in against an opaque disc: pixels outside lose all alpha,
        // pixels inside keep theirs.
        let radius = size_px as f32 / 2.0;
        for (x, y, pixel) in filled.enumerate_pixels_mut() {
            let dx = x as f32 + 0.5 - radius;
            let dy = y as f32 + 0.5 - radius;
            if dx * dx + dy * dy > radius * radius {
                pixel.0[3] = 0;
            }
        }

        encode_png(filled)
    }
}

fn check_size(size_px: u32) -> Result<()> {
    if size_px == 0 {
        return Err(Error::Image("variant size must be positive".into()));
    }
    Ok(())
}

fn encode_png(image: RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Error::Image(format!("Failed to encode PNG: {}", e)))?;
    Ok(buf)
}

/// Decode, orient and contain-fit `bytes` into a `size_px` square PNG.
pub fn resize_square(bytes: &[u8], size_px: u32) -> Result<Vec<u8>> {
    let backend = RasterBackend::new();
    backend.contain(&backend.decode(bytes)?, size_px)
}

/// Decode, orient, cover-fit and circle-mask `bytes` into a `size_px` square PNG.
pub fn mask_circular(bytes: &[u8], size_px: u32) -> Result<Vec<u8>> {
    let backend = RasterBackend::new();
    backend.circle(&backend.decode(bytes)?, size_px)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        encode_png(image).unwrap()
    }

    fn decode_rgba(png: &[u8]) -> RgbaImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    #[test]
    fn test_resize_square_wide_input() {
        let out = decode_rgba(&resize_square(&opaque_png(400, 100), 80).unwrap());
        assert_eq!(out.dimensions(), (80, 80));
        // 400x100 scales to 80x20, centred vertically.
        assert_eq!(out.get_pixel(40, 0).0[3], 0);
        assert_eq!(out.get_pixel(40, 79).0[3], 0);
        assert_eq!(out.get_pixel(40, 40).0[3], 255);
        assert_eq!(out.get_pixel(0, 40).0[3], 255);
    }

    #[test]
    fn test_resize_square_tall_input() {
        let out = decode_rgba(&resize_square(&opaque_png(100, 400), 80).unwrap());
        assert_eq!(out.dimensions(), (80, 80));
        assert_eq!(out.get_pixel(0, 40).0[3], 0);
        assert_eq!(out.get_pixel(79, 40).0[3], 0);
        assert_eq!(out.get_pixel(40, 40).0[3], 255);
        assert_eq!(out.get_pixel(40, 0).0[3], 255);
    }

    #[test]
    fn test_resize_square_upscales_small_input() {
        let out = decode_rgba(&resize_square(&opaque_png(10, 10), 80).unwrap());
        assert_eq!(out.dimensions(), (80, 80));
        assert_eq!(out.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn test_mask_circular_corners_and_center() {
        let out = decode_rgba(&mask_circular(&opaque_png(160, 160), 160).unwrap());
        assert_eq!(out.dimensions(), (160, 160));
        for (x, y) in [(0, 0), (159, 0), (0, 159), (159, 159)] {
            assert_eq!(out.get_pixel(x, y).0[3], 0, "corner ({x}, {y}) must be transparent");
        }
        assert_eq!(out.get_pixel(80, 80).0[3], 255);
    }

    #[test]
    fn test_mask_circular_crops_non_square() {
        let out = decode_rgba(&mask_circular(&opaque_png(300, 120), 90).unwrap());
        assert_eq!(out.dimensions(), (90, 90));
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        // Cover semantics: the edge midpoints are inside the circle and filled.
        assert_eq!(out.get_pixel(45, 1).0[3], 255);
        assert_eq!(out.get_pixel(1, 45).0[3], 255);
    }

    #[test]
    fn test_decode_rejects_non_image() {
        let backend = RasterBackend::new();
        assert!(matches!(backend.decode(b"definitely not an image"), Err(Error::Image(_))));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(resize_square(&opaque_png(4, 4), 0), Err(Error::Image(_))));
    }

    #[test]
    fn test_bundled_default_icons_decode() {
        let backend = RasterBackend::new();
        let icon = backend.decode(crate::assets::DEFAULT_ICON).unwrap();
        let icon2x = backend.decode(crate::assets::DEFAULT_ICON_2X).unwrap();
        assert_eq!((icon.width(), icon.height()), (29, 29));
        assert_eq!((icon2x.width(), icon2x.height()), (58, 58));
    }
}
