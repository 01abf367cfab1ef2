//! Image resize primitive
//!
//! Decodes, resizes to the requested dimensions, and re-encodes in the
//! source format. The primitive is deterministic: identical input bytes and
//! dimensions always produce identical output bytes, which is what lets
//! concurrent duplicate jobs converge on one stored result.

use crate::probe::mime_for_format;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

/// Resize dimensions specification
///
/// Both axes are optional; a missing axis is derived from the source aspect
/// ratio. When both are given the output is forced to exactly that size.
#[derive(Debug, Clone, Copy)]
pub struct ResizeDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Result of a resize: encoded bytes plus the actual output dimensions
#[derive(Debug, Clone)]
pub struct ResizeOutput {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
}

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Calculate target dimensions based on the resize specification
    pub fn calculate_dimensions(
        orig_width: u32,
        orig_height: u32,
        dimensions: ResizeDimensions,
    ) -> (u32, u32) {
        match (dimensions.width, dimensions.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let aspect_ratio = orig_height as f32 / orig_width as f32;
                let h = (w as f32 * aspect_ratio).round() as u32;
                (w, h.max(1))
            }
            (None, Some(h)) => {
                let aspect_ratio = orig_width as f32 / orig_height as f32;
                let w = (h as f32 * aspect_ratio).round() as u32;
                (w.max(1), h)
            }
            (None, None) => (orig_width, orig_height),
        }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Decode, resize, and re-encode in the given format
    ///
    /// Returns the encoded bytes together with the dimensions actually
    /// produced. A resize that resolves to the source dimensions skips the
    /// scaling pass but still re-encodes.
    pub fn resize(
        data: &[u8],
        dimensions: ResizeDimensions,
        format: ImageFormat,
    ) -> Result<ResizeOutput, anyhow::Error> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;

        let (orig_width, orig_height) = img.dimensions();
        let (target_width, target_height) =
            Self::calculate_dimensions(orig_width, orig_height, dimensions);

        tracing::debug!(
            orig_width,
            orig_height,
            target_width,
            target_height,
            "Resizing image"
        );

        let resized = if (target_width, target_height) == (orig_width, orig_height) {
            img
        } else {
            Self::resize_image(&img, target_width, target_height)
        };

        let (width, height) = resized.dimensions();
        let estimated_size = (width * height * 3) as usize;
        let mut buffer = Vec::with_capacity(estimated_size);
        let mut cursor = Cursor::new(&mut buffer);
        resized.write_to(&mut cursor, format)?;

        Ok(ResizeOutput {
            data: Bytes::from(buffer),
            width,
            height,
            mime_type: mime_for_format(format),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn create_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    #[test]
    fn test_calculate_dimensions_both_specified() {
        let (w, h) = ImageResize::calculate_dimensions(
            100,
            100,
            ResizeDimensions {
                width: Some(50),
                height: Some(75),
            },
        );
        assert_eq!(w, 50);
        assert_eq!(h, 75);
    }

    #[test]
    fn test_calculate_dimensions_width_only() {
        let (w, h) = ImageResize::calculate_dimensions(
            100,
            50,
            ResizeDimensions {
                width: Some(200),
                height: None,
            },
        );
        assert_eq!(w, 200);
        // Height should maintain aspect ratio: 50/100 * 200 = 100
        assert_eq!(h, 100);
    }

    #[test]
    fn test_calculate_dimensions_height_only() {
        let (w, h) = ImageResize::calculate_dimensions(
            100,
            50,
            ResizeDimensions {
                width: None,
                height: Some(100),
            },
        );
        // Width should maintain aspect ratio: 100/50 * 100 = 200
        assert_eq!(w, 200);
        assert_eq!(h, 100);
    }

    #[test]
    fn test_resize_image_exact() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255])));
        let resized = ImageResize::resize_image(&img, 50, 50);
        assert_eq!(resized.dimensions(), (50, 50));
    }

    #[test]
    fn test_resize_reports_actual_dimensions() {
        let data = create_test_png(100, 100);
        let output = ImageResize::resize(
            &data,
            ResizeDimensions {
                width: Some(40),
                height: Some(60),
            },
            ImageFormat::Png,
        )
        .unwrap();

        assert_eq!(output.width, 40);
        assert_eq!(output.height, 60);
        assert_eq!(output.mime_type, "image/png");

        let decoded = image::load_from_memory(&output.data).unwrap();
        assert_eq!(decoded.dimensions(), (40, 60));
    }

    #[test]
    fn test_resize_missing_axis_follows_aspect_ratio() {
        let data = create_test_png(100, 50);
        let output = ImageResize::resize(
            &data,
            ResizeDimensions {
                width: Some(200),
                height: None,
            },
            ImageFormat::Png,
        )
        .unwrap();

        assert_eq!(output.width, 200);
        assert_eq!(output.height, 100);
    }

    #[test]
    fn test_resize_is_deterministic() {
        let data = create_test_png(64, 64);
        let dims = ResizeDimensions {
            width: Some(32),
            height: Some(32),
        };

        let first = ImageResize::resize(&data, dims, ImageFormat::Png).unwrap();
        let second = ImageResize::resize(&data, dims, ImageFormat::Png).unwrap();

        assert_eq!(first.data, second.data);
    }

    #[test]
    fn test_resize_to_source_dimensions_still_encodes() {
        let data = create_test_png(30, 30);
        let output = ImageResize::resize(
            &data,
            ResizeDimensions {
                width: Some(30),
                height: Some(30),
            },
            ImageFormat::Png,
        )
        .unwrap();

        assert_eq!(output.width, 30);
        assert_eq!(output.height, 30);
        assert!(!output.data.is_empty());
    }

    #[test]
    fn test_resize_rejects_garbage() {
        let result = ImageResize::resize(
            b"not an image",
            ResizeDimensions {
                width: Some(10),
                height: Some(10),
            },
            ImageFormat::Png,
        );
        assert!(result.is_err());
    }
}
