//! Picstash Worker Library
//!
//! Worker pool for the durable resize queue: LISTEN/NOTIFY wakeup with a
//! polling fallback, semaphore-bounded dispatch, retry with exponential
//! backoff, and a shutdown that drains in-flight tasks.

pub mod context;
pub mod queue;

pub use context::TaskHandlerContext;
pub use queue::{ResizeQueue, ResizeQueueConfig, MAX_RETRY_BACKOFF_SECS};
