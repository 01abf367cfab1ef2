//! Service initialization and application state setup

use picstash_core::Config;
use picstash_db::{FileRepository, ImageRepository, ResizeTaskRepository};
use picstash_storage::Storage;
use picstash_worker::{ResizeQueue, ResizeQueueConfig, TaskHandlerContext};
use sqlx::PgPool;
use std::sync::{Arc, Weak};

use crate::services::notifier::ImageNotifier;
use crate::services::{ContentStore, ImageQueryService, UploadService};
use crate::state::{AppState, DbState, MediaState, TaskState};
use crate::task_handlers::ResizeTaskHandler;

/// Initialize all services and repositories, returning the application state
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Arc<AppState> {
    let file_repository = FileRepository::new(pool.clone());
    let image_repository = ImageRepository::new(pool.clone());
    let task_repository = ResizeTaskRepository::new(pool.clone());

    let notifier = Arc::new(ImageNotifier::default());
    let content = ContentStore::new(file_repository.clone(), storage.clone());

    let upload_service = UploadService::new(
        content.clone(),
        image_repository.clone(),
        file_repository.clone(),
        task_repository.clone(),
        notifier.clone(),
        config.allowed_content_types().to_vec(),
        config.max_file_size_bytes(),
    );
    let query_service = ImageQueryService::new(image_repository.clone());
    let resize_handler = ResizeTaskHandler::new(
        image_repository.clone(),
        file_repository.clone(),
        content,
        notifier.clone(),
    );

    let state = Arc::new(AppState {
        db: DbState {
            pool,
            file_repository,
            image_repository,
            task_repository,
        },
        media: MediaState {
            storage,
            upload_service,
            query_service,
        },
        tasks: TaskState { resize_handler },
        notifier,
        config: config.clone(),
        is_production: config.is_production(),
    });

    tracing::info!("Services initialized successfully");
    state
}

/// Start the resize worker pool against the shared state.
///
/// The pool holds the state weakly so that dropping the application tears
/// the workers down instead of keeping it alive.
pub fn start_resize_queue(config: &Config, state: &Arc<AppState>) -> ResizeQueue {
    let context: Weak<AppState> = Arc::downgrade(state);
    let context: Weak<dyn TaskHandlerContext> = context;
    let queue = ResizeQueue::new(
        state.db.task_repository.clone(),
        ResizeQueueConfig {
            max_workers: config.task_queue_max_workers(),
            poll_interval_ms: config.task_queue_poll_interval_ms(),
        },
        context,
        Some(state.db.pool.clone()),
    );
    tracing::info!(
        max_workers = config.task_queue_max_workers(),
        poll_interval_ms = config.task_queue_poll_interval_ms(),
        "Resize queue initialized successfully"
    );
    queue
}
