//! OpenAPI documentation.
//!
//! Served at `/api/openapi.json` and rendered by RapiDoc at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Picstash API",
        version = "0.1.0",
        description = "Image upload and resize service. Uploads are deduplicated by content hash, resized asynchronously through a durable task queue, and announced per image over server-sent events."
    ),
    paths(
        handlers::image_upload::upload_image,
        handlers::image_get::get_image,
        handlers::image_get::list_images,
        handlers::image_events::image_events,
    ),
    components(schemas(
        handlers::image_upload::UploadAccepted,
        services::ImageDto,
        services::ImagePage,
        error::ErrorResponse,
    )),
    tags(
        (name = "images", description = "Image upload, lookup, and listing"),
        (name = "notifications", description = "Per-image terminal event streams")
    )
)]
pub struct ApiDoc;
