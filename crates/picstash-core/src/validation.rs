//! Validation rules shared by the HTTP boundary and the upload service.

/// Maximum length of an image title, in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Inclusive bounds for requested target dimensions, in pixels.
pub const MIN_TARGET_DIMENSION: i32 = 1;
pub const MAX_TARGET_DIMENSION: i32 = 10_000;

/// Listing page size bounds.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validate an image title: non-empty after trimming and bounded length.
pub fn validate_title(title: &str) -> Result<(), String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err("title must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(format!(
            "title must be at most {} characters",
            MAX_TITLE_LENGTH
        ));
    }
    Ok(())
}

/// Validate a requested target dimension (width or height).
pub fn validate_target_dimension(value: i32) -> Result<(), String> {
    if !(MIN_TARGET_DIMENSION..=MAX_TARGET_DIMENSION).contains(&value) {
        return Err(format!(
            "dimension must be between {} and {}",
            MIN_TARGET_DIMENSION, MAX_TARGET_DIMENSION
        ));
    }
    Ok(())
}

/// Clamp a requested page size into the allowed range, defaulting when absent.
pub fn normalize_page_size(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_title_rejects_empty_and_whitespace() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("sunset").is_ok());
    }

    #[test]
    fn test_validate_title_rejects_overlong() {
        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(validate_title(&long).is_err());
        let max = "x".repeat(MAX_TITLE_LENGTH);
        assert!(validate_title(&max).is_ok());
    }

    #[test]
    fn test_validate_target_dimension_bounds() {
        assert!(validate_target_dimension(0).is_err());
        assert!(validate_target_dimension(-10).is_err());
        assert!(validate_target_dimension(1).is_ok());
        assert!(validate_target_dimension(10_000).is_ok());
        assert!(validate_target_dimension(10_001).is_err());
    }

    #[test]
    fn test_normalize_page_size() {
        assert_eq!(normalize_page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(normalize_page_size(Some(0)), 1);
        assert_eq!(normalize_page_size(Some(50)), 50);
        assert_eq!(normalize_page_size(Some(1_000)), MAX_PAGE_SIZE);
    }
}
