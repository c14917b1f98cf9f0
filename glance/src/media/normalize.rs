//! Image normalization: bounded thumbnail, RGB, JPEG.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// Maximum display size of a normalized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Maximum width in pixels.
    pub max_width: u32,
    /// Maximum height in pixels.
    pub max_height: u32,
}

impl Bounds {
    /// 500x300, the size the page displays thumbnails at.
    pub const DEFAULT: Self = Self::new(500, 300);

    /// Create bounds.
    #[must_use]
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A normalized image ready for preview and analysis.
#[derive(Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// JPEG encoded RGB pixels.
    pub jpeg: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl NormalizedImage {
    /// MIME type of the encoded bytes.
    pub const MIME_TYPE: &'static str = "image/jpeg";

    /// `data:` URL suitable for an `<img src>` preview.
    #[must_use]
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", Self::MIME_TYPE, BASE64.encode(&self.jpeg))
    }
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("jpeg_len", &self.jpeg.len())
            .finish()
    }
}

/// JPEG quality used for normalized images.
const JPEG_QUALITY: u8 = 75;

/// Fit `width x height` inside `bounds`, keeping the aspect ratio.
///
/// Images already inside the bounds are returned unchanged; nothing is
/// upscaled and no side collapses below one pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn thumbnail_dimensions(width: u32, height: u32, bounds: Bounds) -> (u32, u32) {
    if width <= bounds.max_width && height <= bounds.max_height {
        return (width, height);
    }

    let ratio = (f64::from(bounds.max_width) / f64::from(width))
        .min(f64::from(bounds.max_height) / f64::from(height));

    let fit = |side: u32, max: u32| ((f64::from(side) * ratio).round() as u32).clamp(1, max);
    (
        fit(width, bounds.max_width),
        fit(height, bounds.max_height),
    )
}

fn decode(bytes: &[u8], extension: &str) -> Result<DynamicImage, MediaError> {
    match image::load_from_memory(bytes) {
        Ok(img) => Ok(img),
        Err(guess_err) => {
            let format = match extension.to_ascii_lowercase().as_str() {
                "jfif" => Some(ImageFormat::Jpeg),
                ext => ImageFormat::from_extension(ext),
            };
            let Some(format) = format else {
                return Err(MediaError::decode(guess_err.to_string()));
            };
            image::load_from_memory_with_format(bytes, format)
                .map_err(|e| MediaError::decode(e.to_string()))
        }
    }
}

/// Decode, shrink into `bounds`, drop alpha and re-encode as JPEG.
///
/// The format is sniffed from the bytes first; `extension` is only a
/// fallback for content the sniffer does not recognise. This is CPU bound,
/// callers on an async runtime should run it on the blocking pool.
///
/// # Errors
///
/// Returns [`MediaError::Decode`] for malformed input and
/// [`MediaError::Encode`] if the JPEG encoder fails.
pub fn normalize_image(
    bytes: &[u8],
    extension: &str,
    bounds: Bounds,
) -> Result<NormalizedImage, MediaError> {
    let img = decode(bytes, extension)?;

    let (width, height) = thumbnail_dimensions(img.width(), img.height(), bounds);
    let img = if (width, height) == (img.width(), img.height()) {
        img
    } else {
        img.resize_exact(width, height, FilterType::Lanczos3)
    };
    let rgb = img.to_rgb8();

    let mut jpeg = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))
        .map_err(|e| MediaError::encode(e.to_string()))?;

    Ok(NormalizedImage {
        jpeg,
        width,
        height,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use image::{ColorType, GenericImageView, Rgba, RgbaImage};

    use super::*;

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 60, 128]));
        let img = if format == ImageFormat::Jpeg {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8())
        } else {
            DynamicImage::ImageRgba8(img)
        };
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    mod dimensions {
        use super::*;

        #[test]
        fn small_images_are_untouched() {
            assert_eq!(thumbnail_dimensions(320, 200, Bounds::default()), (320, 200));
            assert_eq!(thumbnail_dimensions(500, 300, Bounds::default()), (500, 300));
        }

        #[test]
        fn wide_images_fit_width() {
            assert_eq!(thumbnail_dimensions(1000, 400, Bounds::default()), (500, 200));
        }

        #[test]
        fn tall_images_fit_height() {
            assert_eq!(thumbnail_dimensions(600, 1200, Bounds::default()), (150, 300));
        }

        #[test]
        fn extreme_aspect_keeps_one_pixel() {
            assert_eq!(thumbnail_dimensions(10_000, 2, Bounds::default()), (500, 1));
        }

        #[test]
        fn aspect_ratio_is_preserved() {
            for (w, h) in [(1920, 1080), (4032, 3024), (1080, 1920), (777, 333)] {
                let (nw, nh) = thumbnail_dimensions(w, h, Bounds::default());
                assert!(nw <= 500 && nh <= 300);
                let before = f64::from(w) / f64::from(h);
                let after = f64::from(nw) / f64::from(nh);
                assert!((before - after).abs() / before < 0.02, "{w}x{h} -> {nw}x{nh}");
            }
        }
    }

    mod normalize {
        use super::*;

        #[test]
        fn every_supported_format_is_bounded() {
            for (ext, format) in [
                ("png", ImageFormat::Png),
                ("jpg", ImageFormat::Jpeg),
                ("jpeg", ImageFormat::Jpeg),
                ("jfif", ImageFormat::Jpeg),
            ] {
                let bytes = encoded(1200, 900, format);
                let out = normalize_image(&bytes, ext, Bounds::default()).unwrap();
                assert_eq!((out.width, out.height), (400, 300), "{ext}");
            }
        }

        #[test]
        fn output_decodes_as_rgb_jpeg() {
            let bytes = encoded(800, 800, ImageFormat::Png);
            let out = normalize_image(&bytes, "png", Bounds::default()).unwrap();

            let decoded = image::load_from_memory_with_format(&out.jpeg, ImageFormat::Jpeg).unwrap();
            assert_eq!(decoded.color(), ColorType::Rgb8);
            assert_eq!(decoded.dimensions(), (300, 300));
        }

        #[test]
        fn small_image_is_not_upscaled() {
            let bytes = encoded(40, 20, ImageFormat::Png);
            let out = normalize_image(&bytes, "png", Bounds::default()).unwrap();
            assert_eq!((out.width, out.height), (40, 20));
        }

        #[test]
        fn garbage_is_a_decode_error() {
            let err = normalize_image(b"definitely not an image", "jpg", Bounds::default())
                .unwrap_err();
            assert!(matches!(err, MediaError::Decode(_)));
        }

        #[test]
        fn data_url_prefix() {
            let bytes = encoded(10, 10, ImageFormat::Png);
            let out = normalize_image(&bytes, "png", Bounds::default()).unwrap();
            assert!(out.data_url().starts_with("data:image/jpeg;base64,/9j/"));
        }
    }
}
