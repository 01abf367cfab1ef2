use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::UploadRequest;
use crate::state::MediaState;
use crate::utils::upload::extract_image_upload;

/// Body of a 202 Accepted upload response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadAccepted {
    /// Identifier of the created image; poll or subscribe with this id.
    pub id: Uuid,
}

/// Upload image handler
///
/// Accepts a multipart form with a `file` part plus `title`, `width`, and
/// `height` fields, and delegates to the upload service for validation,
/// content dedup, and resize scheduling. The response carries only the new
/// image id; processing may still be in flight.
///
/// # Errors
/// - `AppError::InvalidInput` - Malformed form or invalid parameters
/// - `AppError::UnsupportedMediaType` - File format outside the allowlist
/// - `AppError::PayloadTooLarge` - File exceeds the configured size limit
/// - `AppError::Storage` - Backend write failure
#[utoipa::path(
    post,
    path = "/api/images",
    tag = "images",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Upload accepted, image created", body = UploadAccepted),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported media type", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(media, multipart), fields(operation = "upload_image"))]
pub async fn upload_image(
    State(media): State<MediaState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = extract_image_upload(multipart).await?;
    let id = media
        .upload_service
        .upload(UploadRequest {
            data: form.data,
            file_name: form.file_name,
            content_type: form.content_type,
            title: form.title,
            target_width: form.width,
            target_height: form.height,
        })
        .await?;

    Ok((StatusCode::ACCEPTED, Json(UploadAccepted { id })))
}
