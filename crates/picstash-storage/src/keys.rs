//! Shared key generation for storage backends.
//!
//! Key format: `media/{checksum}{ext}`. Keys are content-addressed, so the
//! same bytes always map to the same object regardless of who uploads them.

/// File extension for a mime type, used when building storage keys.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        _ => "",
    }
}

/// Generate the content-addressed storage key for a checksum and mime type.
///
/// All backends and callers must use this format for consistency.
pub fn storage_key(checksum: &str, mime_type: &str) -> String {
    format!("media/{}{}", checksum, extension_for_mime(mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_content_addressed() {
        let checksum = "a".repeat(64);
        assert_eq!(
            storage_key(&checksum, "image/jpeg"),
            format!("media/{}.jpg", checksum)
        );
        assert_eq!(
            storage_key(&checksum, "image/png"),
            storage_key(&checksum, "image/png")
        );
    }

    #[test]
    fn test_unknown_mime_has_no_extension() {
        let checksum = "b".repeat(64);
        assert_eq!(
            storage_key(&checksum, "application/octet-stream"),
            format!("media/{}", checksum)
        );
    }
}
