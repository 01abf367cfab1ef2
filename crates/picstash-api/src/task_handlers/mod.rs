//! Background task handlers.
//!
//! The queue crate knows nothing about images; it dispatches claimed tasks
//! through [`TaskHandlerContext`], which the application state implements by
//! routing to the matching handler.

pub mod resize;

pub use resize::ResizeTaskHandler;

use async_trait::async_trait;
use picstash_core::models::ResizeTask;
use picstash_worker::TaskHandlerContext;
use std::sync::Arc;

use crate::state::AppState;

#[async_trait]
impl TaskHandlerContext for AppState {
    async fn dispatch_task(self: Arc<Self>, task: &ResizeTask) -> anyhow::Result<serde_json::Value> {
        self.tasks.resize_handler.handle(task).await
    }
}
