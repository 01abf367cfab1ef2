//! Image read models: DTO assembly and cursor pagination.
//!
//! Cursors are opaque to clients: base64 over the RFC 3339 `created_at` of a
//! page edge. Microsecond precision matches what Postgres stores, so an
//! encoded cursor survives the round trip exactly.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use picstash_core::models::ImageDetails;
use picstash_core::validation::normalize_page_size;
use picstash_core::AppError;
use picstash_db::{ImageListQuery, ImageRepository, ListDirection};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Client-facing image representation. URL and dimensions describe the
/// artifact a client should fetch right now: the processed file when it
/// exists, otherwise the original.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageDto {
    pub id: Uuid,
    pub url: String,
    pub title: String,
    pub width: i32,
    pub height: i32,
    pub created_at: DateTime<Utc>,
}

impl ImageDto {
    pub fn from_details(details: &ImageDetails) -> Self {
        let (width, height) = details.serving_dimensions();
        Self {
            id: details.image.id,
            url: details.serving_url().to_string(),
            title: details.image.title.clone(),
            width,
            height,
            created_at: details.image.created_at,
        }
    }
}

/// One page of results plus navigation state. Cursors are the `created_at`
/// of the page edges; both are null on an empty page.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImagePage {
    pub items: Vec<ImageDto>,
    pub has_next: bool,
    pub has_prev: bool,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

/// Validated listing parameters, as assembled by the HTTP handler.
#[derive(Debug, Clone)]
pub struct ListImagesParams {
    pub title: Option<String>,
    pub cursor: Option<String>,
    pub direction: ListDirection,
    pub limit: Option<i64>,
}

/// Encode a page-edge timestamp as an opaque cursor.
pub fn encode_cursor(created_at: &DateTime<Utc>) -> String {
    URL_SAFE_NO_PAD.encode(created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Decode a client-supplied cursor. Any malformed input is a client error;
/// the cursor format is not part of the public contract.
pub fn decode_cursor(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let invalid = || AppError::InvalidInput("Invalid cursor".to_string());
    let bytes = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid())
}

/// Derive `(has_next, has_prev)` for a page.
///
/// Paging forward, the overflow row answers "is there an older page" and the
/// presence of a cursor answers "is there a newer one". Paging backward the
/// overflow answers the newer side, and the page the cursor came from is
/// always still there on the older side.
fn page_flags(direction: ListDirection, cursor_given: bool, has_more: bool) -> (bool, bool) {
    match direction {
        ListDirection::Next => (has_more, cursor_given),
        ListDirection::Prev => (true, has_more),
    }
}

/// Read-side image queries: single lookups and cursor-paginated listings.
#[derive(Clone)]
pub struct ImageQueryService {
    images: ImageRepository,
}

impl ImageQueryService {
    pub fn new(images: ImageRepository) -> Self {
        Self { images }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ImageDto>, AppError> {
        let details = self.images.get_details(id).await?;
        Ok(details.as_ref().map(ImageDto::from_details))
    }

    #[tracing::instrument(skip(self), fields(operation = "list_images"))]
    pub async fn list(&self, params: ListImagesParams) -> Result<ImagePage, AppError> {
        let cursor = params.cursor.as_deref().map(decode_cursor).transpose()?;
        let limit = normalize_page_size(params.limit);

        let page = self
            .images
            .list(ImageListQuery {
                title: params.title,
                cursor,
                direction: params.direction,
                limit,
            })
            .await?;

        let (has_next, has_prev) = page_flags(params.direction, cursor.is_some(), page.has_more);
        let items: Vec<ImageDto> = page.items.iter().map(ImageDto::from_details).collect();
        // Items are in display order (newest first) for both directions, so
        // the backward cursor is the first row and the forward one the last.
        let next_cursor = items.last().map(|dto| encode_cursor(&dto.created_at));
        let prev_cursor = items.first().map(|dto| encode_cursor(&dto.created_at));

        Ok(ImagePage {
            items,
            has_next,
            has_prev,
            next_cursor,
            prev_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_round_trip() {
        let ts = DateTime::parse_from_rfc3339("2026-08-25T12:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let cursor = encode_cursor(&ts);
        assert_eq!(decode_cursor(&cursor).unwrap(), ts);
    }

    #[test]
    fn test_decode_cursor_rejects_garbage() {
        assert!(decode_cursor("not-base64!!").is_err());
        // Valid base64, but not a timestamp.
        assert!(decode_cursor(&URL_SAFE_NO_PAD.encode("yesterday")).is_err());
        assert!(decode_cursor(&URL_SAFE_NO_PAD.encode([0xff, 0xfe])).is_err());
    }

    #[test]
    fn test_page_flags_forward() {
        // First page: no cursor, more rows below.
        assert_eq!(page_flags(ListDirection::Next, false, true), (true, false));
        // Middle page.
        assert_eq!(page_flags(ListDirection::Next, true, true), (true, true));
        // Last page.
        assert_eq!(page_flags(ListDirection::Next, true, false), (false, true));
        // Single page of everything.
        assert_eq!(page_flags(ListDirection::Next, false, false), (false, false));
    }

    #[test]
    fn test_page_flags_backward() {
        // Paging back with more newer rows beyond this page.
        assert_eq!(page_flags(ListDirection::Prev, true, true), (true, true));
        // Reached the newest page; the origin page is still behind us.
        assert_eq!(page_flags(ListDirection::Prev, true, false), (true, false));
    }
}
