//! Resize task handler
//!
//! Executes one queued resize: load the original bytes, scale and re-encode
//! on a blocking thread, store the processed artifact, and flip the image to
//! its terminal status. Terminal transitions are conditional updates, so a
//! duplicate or late task observes `None` and skips its event instead of
//! firing a second one.

use anyhow::Context;
use picstash_core::models::{ImageEvent, ResizeJob, ResizeTask, IMAGE_PROCESSED_MESSAGE};
use picstash_db::{FileRepository, ImageRepository};
use picstash_processing::{format_for_mime, ImageResize, ResizeDimensions};
use serde_json::json;
use std::sync::Arc;

use crate::services::content::ContentStore;
use crate::services::notifier::ImageNotifier;

/// Handler for resize tasks claimed off the queue.
#[derive(Clone)]
pub struct ResizeTaskHandler {
    images: ImageRepository,
    files: FileRepository,
    content: ContentStore,
    notifier: Arc<ImageNotifier>,
}

impl ResizeTaskHandler {
    pub fn new(
        images: ImageRepository,
        files: FileRepository,
        content: ContentStore,
        notifier: Arc<ImageNotifier>,
    ) -> Self {
        Self {
            images,
            files,
            content,
            notifier,
        }
    }

    /// Run one claimed task to completion.
    ///
    /// An `Err` on a task that still has retries left leaves the image in
    /// processing; on the final attempt the image is marked failed and a
    /// failure event published before the error is returned to the queue.
    #[tracing::instrument(
        skip(self, task),
        fields(task_id = %task.id, retry_count = task.retry_count, operation = "resize_task")
    )]
    pub async fn handle(&self, task: &ResizeTask) -> anyhow::Result<serde_json::Value> {
        let job = task
            .job()
            .context("Failed to parse resize task payload")?;

        match self.process(&job).await {
            Ok(result) => Ok(result),
            Err(err) if task.can_retry() => Err(err),
            Err(err) => {
                self.mark_image_failed(&job, &err).await;
                Err(err)
            }
        }
    }

    async fn process(&self, job: &ResizeJob) -> anyhow::Result<serde_json::Value> {
        let Some(image) = self.images.get_by_id(job.image_id).await? else {
            tracing::warn!(image_id = %job.image_id, "Resize task references a missing image");
            anyhow::bail!("image {} not found", job.image_id);
        };
        if image.status.is_terminal() {
            tracing::debug!(image_id = %image.id, status = ?image.status, "Image already terminal");
            return Ok(json!({ "skipped": "image already terminal" }));
        }

        let original = self
            .files
            .get_by_id(image.original_file_id)
            .await?
            .with_context(|| format!("original file {} missing", image.original_file_id))?;
        let data = self.content.get(&original).await?;

        let format = format_for_mime(&original.mime_type)
            .with_context(|| format!("no encoder for mime type {}", original.mime_type))?;
        let dimensions = ResizeDimensions {
            width: job.target_width.map(|w| w as u32),
            height: job.target_height.map(|h| h as u32),
        };
        let output = tokio::task::spawn_blocking(move || ImageResize::resize(&data, dimensions, format))
            .await
            .context("Resize task panicked")??;

        let processed = self
            .content
            .put(&original.file_name, output.mime_type, &output.data)
            .await?;

        match self
            .images
            .mark_stored(job.image_id, processed.id, output.width as i32, output.height as i32)
            .await?
        {
            Some(_) => {
                tracing::info!(
                    image_id = %job.image_id,
                    width = output.width,
                    height = output.height,
                    "Image resize completed"
                );
                self.notifier.publish(&ImageEvent::completed(
                    job.image_id,
                    IMAGE_PROCESSED_MESSAGE,
                    processed.url,
                ));
                Ok(json!({
                    "processedFileId": processed.id,
                    "width": output.width,
                    "height": output.height,
                }))
            }
            None => {
                tracing::debug!(
                    image_id = %job.image_id,
                    "Image reached a terminal status before this resize finished"
                );
                Ok(json!({ "skipped": "image already terminal" }))
            }
        }
    }

    /// Flip the image to failed on the task's last attempt. Only the
    /// transition that actually changed the row publishes the event.
    async fn mark_image_failed(&self, job: &ResizeJob, err: &anyhow::Error) {
        match self.images.mark_failed(job.image_id).await {
            Ok(Some(image)) => {
                self.notifier
                    .publish(&ImageEvent::failed(image.id, err.to_string()));
            }
            Ok(None) => {
                tracing::debug!(
                    image_id = %job.image_id,
                    "No processing image to fail, skipping failure event"
                );
            }
            Err(db_err) => {
                tracing::error!(
                    image_id = %job.image_id,
                    error = %db_err,
                    "Failed to record image failure"
                );
            }
        }
    }
}
