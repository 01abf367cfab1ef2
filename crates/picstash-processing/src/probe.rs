//! Image probing - format sniffing and dimension extraction

use image::{GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;

/// Errors raised while probing uploaded content
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Empty file")]
    EmptyFile,

    #[error("Content is not a recognized image")]
    UnknownFormat,

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),
}

/// Facts established by probing: sniffed format and pixel dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    /// Canonical mime type of the sniffed format
    pub fn mime_type(&self) -> &'static str {
        mime_for_format(self.format)
    }
}

/// Mime type for an image format
pub fn mime_for_format(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Image format for a mime type, if it maps to one we can encode
pub fn format_for_mime(mime_type: &str) -> Option<ImageFormat> {
    match mime_type {
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// Image probing and format validation
pub struct ImageProbe;

impl ImageProbe {
    /// Formats accepted for upload. Everything else is rejected before any
    /// bytes reach storage.
    pub const ALLOWED_FORMATS: [ImageFormat; 3] =
        [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::WebP];

    pub fn is_allowed(format: ImageFormat) -> bool {
        Self::ALLOWED_FORMATS.contains(&format)
    }

    /// Sniff the format from the content bytes and decode for dimensions
    ///
    /// The sniffed format is authoritative for what gets stored; the declared
    /// multipart content type is validated separately at the HTTP boundary.
    pub fn probe(data: &[u8]) -> Result<ImageInfo, ProbeError> {
        if data.is_empty() {
            return Err(ProbeError::EmptyFile);
        }

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProbeError::DecodeFailed(e.to_string()))?;

        let format = reader.format().ok_or(ProbeError::UnknownFormat)?;
        if !Self::is_allowed(format) {
            return Err(ProbeError::UnsupportedFormat(format!("{:?}", format)));
        }

        let img = reader
            .decode()
            .map_err(|e| ProbeError::DecodeFailed(e.to_string()))?;
        let (width, height) = img.dimensions();

        Ok(ImageInfo {
            format,
            width,
            height,
        })
    }
}
