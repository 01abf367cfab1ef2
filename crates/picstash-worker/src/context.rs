//! Task handler context trait
//!
//! The API implements this trait for its application state. The worker calls
//! `dispatch_task` with each claimed task; the implementation decodes the
//! payload and runs the resize handler.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use picstash_core::models::ResizeTask;

/// Context for task dispatch.
///
/// Implemented by the API's application state. The worker holds a weak
/// reference so the queue never keeps the application state alive on its own;
/// once the state is dropped, dispatch stops with an error instead of running
/// against torn-down services.
#[async_trait]
pub trait TaskHandlerContext: Send + Sync {
    /// Run the handler for a claimed task and return its result payload.
    async fn dispatch_task(self: Arc<Self>, task: &ResizeTask) -> Result<serde_json::Value>;
}
