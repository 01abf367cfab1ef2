//! Common utilities for the image upload handler

use axum::extract::Multipart;
use bytes::Bytes;
use picstash_core::AppError;

/// Fields extracted from the upload form. `width` and `height` are the
/// requested target dimensions, not the file's actual dimensions.
#[derive(Debug)]
pub struct ImageUploadForm {
    pub data: Bytes,
    pub file_name: String,
    pub content_type: String,
    pub title: String,
    pub width: i32,
    pub height: i32,
}

/// Extract the upload form from multipart data.
/// Only one field named "file" is accepted; multiple file fields are rejected.
/// Unknown fields are ignored.
pub async fn extract_image_upload(mut multipart: Multipart) -> Result<ImageUploadForm, AppError> {
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut title: Option<String> = None;
    let mut width: Option<i32> = None;
    let mut height: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        match field_name.as_str() {
            "file" => {
                if file_data.is_some() {
                    return Err(AppError::InvalidInput(
                        "Multiple file fields are not allowed; send exactly one field named 'file'"
                            .to_string(),
                    ));
                }
                file_name = field.file_name().map(|s: &str| s.to_string());
                content_type = field.content_type().map(|s: &str| s.to_string());

                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;
                file_data = Some(data);
            }
            "title" => {
                let text = read_text_field(field, "title").await?;
                title = Some(text);
            }
            "width" => {
                let text = read_text_field(field, "width").await?;
                width = Some(parse_dimension_field("width", &text)?);
            }
            "height" => {
                let text = read_text_field(field, "height").await?;
                height = Some(parse_dimension_field("height", &text)?);
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
    let title =
        title.ok_or_else(|| AppError::InvalidInput("Missing form field 'title'".to_string()))?;
    let width =
        width.ok_or_else(|| AppError::InvalidInput("Missing form field 'width'".to_string()))?;
    let height =
        height.ok_or_else(|| AppError::InvalidInput("Missing form field 'height'".to_string()))?;

    Ok(ImageUploadForm {
        data,
        file_name: file_name.unwrap_or_else(|| "unknown".to_string()),
        content_type: content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
        title,
        width,
        height,
    })
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read form field '{}': {}", name, e)))
}

/// Parse a target dimension form value. Range validation happens later in the
/// upload service together with the other preconditions.
pub fn parse_dimension_field(name: &str, value: &str) -> Result<i32, AppError> {
    value.trim().parse::<i32>().map_err(|_| {
        AppError::InvalidInput(format!("Form field '{}' must be an integer", name))
    })
}

/// Validate file size against the configured maximum. A maximum of 0 means
/// uploads are unlimited.
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if max_size > 0 && file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size {} bytes exceeds maximum allowed size of {} bytes",
            file_size, max_size
        )));
    }
    Ok(())
}

/// Normalize MIME type by stripping parameters (e.g. "image/jpeg; charset=utf-8" -> "image/jpeg").
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

/// Validate content type against allowlist. Compares normalized MIME type only (no parameter bypass).
pub fn validate_content_type(content_type: &str, allowed_types: &[String]) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type).to_lowercase();
    if !allowed_types.iter().any(|ct| normalized == ct.to_lowercase()) {
        return Err(AppError::InvalidInput(format!(
            "Invalid content type '{}'. Allowed types: {}",
            content_type,
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/webp".to_string(),
        ]
    }

    #[test]
    fn test_validate_content_type_accepts_allowed() {
        assert!(validate_content_type("image/png", &allowed()).is_ok());
        assert!(validate_content_type("IMAGE/JPEG", &allowed()).is_ok());
    }

    #[test]
    fn test_validate_content_type_strips_parameters() {
        assert!(validate_content_type("image/jpeg; charset=utf-8", &allowed()).is_ok());
    }

    #[test]
    fn test_validate_content_type_rejects_unknown() {
        assert!(validate_content_type("image/gif", &allowed()).is_err());
        assert!(validate_content_type("application/octet-stream", &allowed()).is_err());
    }

    #[test]
    fn test_validate_file_size_zero_max_is_unlimited() {
        assert!(validate_file_size(usize::MAX, 0).is_ok());
    }

    #[test]
    fn test_validate_file_size_enforces_max() {
        assert!(validate_file_size(100, 100).is_ok());
        assert!(validate_file_size(101, 100).is_err());
    }

    #[test]
    fn test_parse_dimension_field() {
        assert_eq!(parse_dimension_field("width", "800").unwrap(), 800);
        assert_eq!(parse_dimension_field("width", " 800 ").unwrap(), 800);
        assert!(parse_dimension_field("width", "eight").is_err());
        assert!(parse_dimension_field("width", "8.5").is_err());
        assert!(parse_dimension_field("width", "").is_err());
    }
}
