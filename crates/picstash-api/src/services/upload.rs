//! Upload orchestration: validation, content dedup, and resize scheduling.
//!
//! Dedup operates at two independent levels. Identical bytes converge on one
//! file row regardless of concurrency (database unique constraint with
//! insert-or-reuse semantics). Identical (bytes, target size) pairs converge
//! on one shared processed file; that check is a plain read, and the rare
//! race where two uploads both enqueue a resize stays safe because the
//! resize primitive is deterministic and the worker skips images that are
//! already terminal.

use bytes::Bytes;
use picstash_core::models::{
    ImageEvent, NewProcessingImage, NewStoredImage, ResizeJob, IMAGE_READY_MESSAGE,
};
use picstash_core::validation::{validate_target_dimension, validate_title};
use picstash_core::AppError;
use picstash_db::{FileRepository, ImageRepository, ResizeTaskRepository};
use picstash_processing::ImageProbe;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::probe_error_to_app_error;
use crate::services::content::ContentStore;
use crate::services::notifier::ImageNotifier;
use crate::utils::upload::{validate_content_type, validate_file_size};

/// Resize failures are deterministic, so their tasks get no retries.
pub const RESIZE_TASK_MAX_RETRIES: i32 = 0;

/// Validated upload input: the raw bytes plus the client's declared metadata
/// and requested target size.
#[derive(Debug)]
pub struct UploadRequest {
    pub data: Bytes,
    pub file_name: String,
    pub content_type: String,
    pub title: String,
    pub target_width: i32,
    pub target_height: i32,
}

/// The upload engine: probes, dedups, and either finishes the image
/// synchronously or queues a resize.
#[derive(Clone)]
pub struct UploadService {
    content: ContentStore,
    images: ImageRepository,
    files: FileRepository,
    tasks: ResizeTaskRepository,
    notifier: Arc<ImageNotifier>,
    allowed_content_types: Vec<String>,
    max_file_size_bytes: usize,
}

impl UploadService {
    pub fn new(
        content: ContentStore,
        images: ImageRepository,
        files: FileRepository,
        tasks: ResizeTaskRepository,
        notifier: Arc<ImageNotifier>,
        allowed_content_types: Vec<String>,
        max_file_size_bytes: usize,
    ) -> Self {
        Self {
            content,
            images,
            files,
            tasks,
            notifier,
            allowed_content_types,
            max_file_size_bytes,
        }
    }

    /// Accept an upload and return the id of the created image.
    ///
    /// The image is terminal immediately when the original already has the
    /// requested size or a finished sibling's processed file can be shared;
    /// otherwise it is created as processing with a resize task queued.
    #[tracing::instrument(
        skip(self, request),
        fields(
            title = %request.title,
            target_width = request.target_width,
            target_height = request.target_height,
            operation = "upload_image"
        )
    )]
    pub async fn upload(&self, request: UploadRequest) -> Result<Uuid, AppError> {
        validate_title(&request.title).map_err(AppError::InvalidInput)?;
        validate_target_dimension(request.target_width)
            .map_err(|e| AppError::InvalidInput(format!("width: {}", e)))?;
        validate_target_dimension(request.target_height)
            .map_err(|e| AppError::InvalidInput(format!("height: {}", e)))?;
        validate_file_size(request.data.len(), self.max_file_size_bytes)?;
        validate_content_type(&request.content_type, &self.allowed_content_types)?;

        // Decode on a blocking thread. The dimensions it reports are
        // authoritative; the caller's width and height are only targets.
        let data = request.data.clone();
        let info = tokio::task::spawn_blocking(move || ImageProbe::probe(&data))
            .await
            .map_err(|e| AppError::Internal(format!("Image probe task failed: {}", e)))?
            .map_err(probe_error_to_app_error)?;

        // The sniffed format is what actually gets stored, so it must pass
        // the same allowlist as the declared content type.
        let mime_type = info.mime_type();
        validate_content_type(mime_type, &self.allowed_content_types)?;

        let title = request.title.trim().to_string();
        let original = self
            .content
            .put(&request.file_name, mime_type, &request.data)
            .await?;
        let original_width = info.width as i32;
        let original_height = info.height as i32;

        // Already the requested size: the original doubles as the processed
        // file and the image is born terminal.
        if original_width == request.target_width && original_height == request.target_height {
            let image = self
                .images
                .create_stored(NewStoredImage {
                    title,
                    original_width,
                    original_height,
                    processed_width: original_width,
                    processed_height: original_height,
                    original_file_id: original.id,
                    processed_file_id: original.id,
                })
                .await?;
            tracing::info!(image_id = %image.id, "Image stored without resize");
            self.notifier.publish(&ImageEvent::completed(
                image.id,
                IMAGE_READY_MESSAGE,
                original.url,
            ));
            return Ok(image.id);
        }

        // A finished sibling with the same source and target size lets this
        // upload skip the queue and share its processed file.
        if let Some((width, height, file_id)) = self
            .find_reusable_variant(original.id, request.target_width, request.target_height)
            .await?
        {
            let processed = self.files.get_by_id(file_id).await?.ok_or_else(|| {
                AppError::Internal(format!(
                    "stored variant references missing processed file {}",
                    file_id
                ))
            })?;
            let image = self
                .images
                .create_stored(NewStoredImage {
                    title,
                    original_width,
                    original_height,
                    processed_width: width,
                    processed_height: height,
                    original_file_id: original.id,
                    processed_file_id: file_id,
                })
                .await?;
            tracing::info!(
                image_id = %image.id,
                processed_file_id = %file_id,
                "Image stored reusing an existing processed variant"
            );
            self.notifier.publish(&ImageEvent::completed(
                image.id,
                IMAGE_READY_MESSAGE,
                processed.url,
            ));
            return Ok(image.id);
        }

        // No processed variant exists yet: record the image as processing
        // and queue the resize.
        let image = self
            .images
            .create_processing(NewProcessingImage {
                title: title.clone(),
                original_width,
                original_height,
                original_file_id: original.id,
            })
            .await?;
        let job = ResizeJob {
            image_id: image.id,
            title,
            target_width: Some(request.target_width),
            target_height: Some(request.target_height),
        };
        self.tasks.enqueue(&job, RESIZE_TASK_MAX_RETRIES).await?;
        tracing::info!(image_id = %image.id, "Image accepted for asynchronous resize");
        Ok(image.id)
    }

    /// Look for a stored sibling image of the same original at the same
    /// target size whose processed artifact is complete enough to share.
    async fn find_reusable_variant(
        &self,
        original_file_id: Uuid,
        width: i32,
        height: i32,
    ) -> Result<Option<(i32, i32, Uuid)>, AppError> {
        let existing = self
            .images
            .find_stored_variant(original_file_id, width, height)
            .await?;
        Ok(existing.and_then(|image| {
            match (
                image.processed_width,
                image.processed_height,
                image.processed_file_id,
            ) {
                (Some(w), Some(h), Some(file_id)) => Some((w, h, file_id)),
                _ => None,
            }
        }))
    }
}
