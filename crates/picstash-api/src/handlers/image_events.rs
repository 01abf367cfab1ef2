use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures::stream::BoxStream;
use futures::StreamExt;
use picstash_core::models::{
    ImageEvent, ImageStatus, IMAGE_FAILED_DEFAULT_MESSAGE, IMAGE_READY_MESSAGE,
};
use picstash_core::AppError;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// SSE stream of terminal events for one image.
///
/// The stream yields exactly one event, `completed` or `failed`, and then
/// ends. An image that is already terminal gets its event synthesized from
/// the stored row, so subscribers never hang on work that finished before
/// they connected.
///
/// # Errors
/// - `AppError::InvalidInput` - Malformed image id
/// - `AppError::NotFound` - No image with this id
#[utoipa::path(
    get,
    path = "/api/notifications/images/events/{id}",
    tag = "notifications",
    params(
        ("id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 400, description = "Invalid image id", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(image_id = %id, operation = "image_events"))]
pub async fn image_events(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Sse<KeepAliveStream<BoxStream<'static, Result<Event, Infallible>>>>, HttpAppError> {
    let id =
        Uuid::parse_str(&id).map_err(|_| AppError::InvalidInput("Invalid image id".to_string()))?;

    // Subscribe before the status read so a transition between the two is
    // never missed.
    let subscription = state.notifier.subscribe(id);

    let details = state
        .db
        .image_repository
        .get_details(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))?;

    let stream: BoxStream<'static, Result<Event, Infallible>> = match details.image.status {
        ImageStatus::Stored => {
            drop(subscription);
            let event = ImageEvent::completed(id, IMAGE_READY_MESSAGE, details.serving_url());
            futures::stream::once(async move { Ok(sse_event(&event)) }).boxed()
        }
        ImageStatus::Failed => {
            drop(subscription);
            let event = ImageEvent::failed(id, IMAGE_FAILED_DEFAULT_MESSAGE);
            futures::stream::once(async move { Ok(sse_event(&event)) }).boxed()
        }
        ImageStatus::Processing => subscription.map(|event| Ok(sse_event(&event))).boxed(),
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

fn sse_event(event: &ImageEvent) -> Event {
    match Event::default().json_data(event) {
        Ok(event) => event,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize image event");
            Event::default().data("{}")
        }
    }
}
