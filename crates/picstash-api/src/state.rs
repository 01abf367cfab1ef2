//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only what they need
//! via Axum's `FromRef`, and to avoid a single god object with duplicate repositories.

use picstash_core::Config;
use picstash_db::{FileRepository, ImageRepository, ResizeTaskRepository};
use picstash_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

use crate::services::notifier::ImageNotifier;
use crate::services::{ImageQueryService, UploadService};
use crate::task_handlers::ResizeTaskHandler;

// ----- Sub-state types -----

/// Database pool and repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub file_repository: FileRepository,
    pub image_repository: ImageRepository,
    pub task_repository: ResizeTaskRepository,
}

/// Storage backend and the services that read and write image content.
#[derive(Clone)]
pub struct MediaState {
    pub storage: Arc<dyn Storage>,
    pub upload_service: UploadService,
    pub query_service: ImageQueryService,
}

/// Background resize wiring: the handler the worker pool dispatches into.
#[derive(Clone)]
pub struct TaskState {
    pub resize_handler: ResizeTaskHandler,
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
pub struct AppState {
    pub db: DbState,
    pub media: MediaState,
    pub tasks: TaskState,
    pub notifier: Arc<ImageNotifier>,
    pub config: Config,
    pub is_production: bool,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for MediaState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.media.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for TaskState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.tasks.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
