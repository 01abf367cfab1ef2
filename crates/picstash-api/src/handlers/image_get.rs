use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use picstash_core::AppError;
use picstash_db::ListDirection;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::services::{ImageDto, ImagePage, ListImagesParams};
use crate::state::MediaState;

/// Parse a path segment as a UUID, keeping the JSON error shape for
/// malformed ids instead of axum's plain-text rejection.
fn parse_image_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput("Invalid image id".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/images/{id}",
    tag = "images",
    params(
        ("id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image found", body = ImageDto),
        (status = 400, description = "Invalid image id", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(media), fields(image_id = %id, operation = "get_image"))]
pub async fn get_image(
    Path(id): Path<String>,
    State(media): State<MediaState>,
) -> Result<impl IntoResponse, HttpAppError> {
    let id = parse_image_id(&id)?;
    let image = media
        .query_service
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    Ok(Json(image))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListImagesQuery {
    /// Case-insensitive title substring filter.
    pub title: Option<String>,
    /// Opaque cursor from a previous page's `nextCursor` or `prevCursor`.
    pub cursor: Option<String>,
    /// Paging direction relative to the cursor: `next` (default) or `prev`.
    pub direction: Option<String>,
    /// Page size, clamped to 1..=100 (default 20).
    pub limit: Option<i64>,
}

fn parse_direction(raw: Option<&str>) -> Result<ListDirection, AppError> {
    match raw {
        None | Some("next") => Ok(ListDirection::Next),
        Some("prev") => Ok(ListDirection::Prev),
        Some(other) => Err(AppError::InvalidInput(format!(
            "Invalid direction '{}': expected 'next' or 'prev'",
            other
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/api/images",
    tag = "images",
    params(
        ListImagesQuery
    ),
    responses(
        (status = 200, description = "Page of images", body = ImagePage),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(media, query),
    fields(
        title = ?query.title,
        direction = ?query.direction,
        limit = ?query.limit,
        operation = "list_images"
    )
)]
pub async fn list_images(
    State(media): State<MediaState>,
    Query(query): Query<ListImagesQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let direction = parse_direction(query.direction.as_deref())?;
    let page = media
        .query_service
        .list(ListImagesParams {
            title: query.title,
            cursor: query.cursor,
            direction,
            limit: query.limit,
        })
        .await?;

    Ok(Json(page))
}
