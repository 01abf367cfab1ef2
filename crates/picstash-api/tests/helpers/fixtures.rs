//! Test fixtures: real encoded images the probe and resize pipeline accept.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Encode a PNG of the given dimensions. A coordinate gradient keeps the
/// bytes deterministic while differing between dimension pairs.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("failed to encode test PNG");
    buffer
}

/// Encode a PNG whose pixel content differs from `create_test_png` at the
/// same dimensions, for exercising distinct-content paths.
pub fn create_test_png_variant(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            seed.wrapping_add((x % 256) as u8),
            seed.wrapping_mul(3).wrapping_add((y % 256) as u8),
            seed,
        ])
    });
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("failed to encode test PNG");
    buffer
}

/// Bytes that are not any image format.
pub fn create_garbage_bytes() -> Vec<u8> {
    b"this is definitely not an image".to_vec()
}

/// Bytes carrying a GIF signature: a format the probe recognizes but the
/// pipeline does not accept.
pub fn create_gif_bytes() -> Vec<u8> {
    let mut gif = b"GIF89a".to_vec();
    gif.extend_from_slice(&[0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00]);
    gif.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x3B]);
    gif
}
