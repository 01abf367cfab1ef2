//! Resize queue: worker pool, LISTEN/NOTIFY or polling, retry, shutdown.
//!
//! Shutdown: [`ResizeQueue::shutdown`] signals the pool to stop claiming and
//! then waits for in-flight tasks to finish, so callers can drop the process
//! as soon as it returns.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::time::sleep;

use picstash_core::models::ResizeTask;
use picstash_db::{ResizeTaskRepository, TASK_NOTIFY_CHANNEL};

use crate::context::TaskHandlerContext;

/// Maximum delay in seconds before retrying a failed task. Caps exponential
/// backoff so that high retry counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given retry count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(retry_count: i32) -> u64 {
    2_u64.saturating_pow(retry_count as u32).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct ResizeQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
}

impl Default for ResizeQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            poll_interval_ms: 10_000,
        }
    }
}

/// Handle to a running worker pool.
#[derive(Clone)]
pub struct ResizeQueue {
    shutdown_tx: mpsc::Sender<()>,
    stopped_rx: watch::Receiver<bool>,
}

impl ResizeQueue {
    /// Spawn the worker pool.
    ///
    /// If `pool` is `Some`, the workers use PostgreSQL LISTEN/NOTIFY to wake
    /// immediately when tasks are enqueued, in addition to polling at
    /// `poll_interval_ms`. If `pool` is `None`, only polling is used.
    pub fn new(
        repository: ResizeTaskRepository,
        config: ResizeQueueConfig,
        context: Weak<dyn TaskHandlerContext>,
        pool: Option<sqlx::PgPool>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (stopped_tx, stopped_rx) = watch::channel(false);

        tokio::spawn(async move {
            Self::worker_pool(repository, config, context, shutdown_rx, pool, stopped_tx).await;
        });

        Self {
            shutdown_tx,
            stopped_rx,
        }
    }

    async fn worker_pool(
        repository: ResizeTaskRepository,
        config: ResizeQueueConfig,
        context: Weak<dyn TaskHandlerContext>,
        mut shutdown_rx: mpsc::Receiver<()>,
        pool: Option<sqlx::PgPool>,
        stopped_tx: watch::Sender<bool>,
    ) {
        let use_listen = pool.is_some();
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            listen_notify = use_listen,
            "Resize queue worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Wakes the main loop when LISTEN receives a NOTIFY; the poll arm
        // covers lost notifications and plain connection loss.
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        if let Some(pool) = pool {
            let tx = notify_tx.clone();
            tokio::spawn(async move {
                loop {
                    match sqlx::postgres::PgListener::connect_with(&pool).await {
                        Ok(mut listener) => {
                            if let Err(e) = listener.listen(TASK_NOTIFY_CHANNEL).await {
                                tracing::warn!(error = %e, "LISTEN failed, will retry");
                                tokio::time::sleep(Duration::from_secs(5)).await;
                                continue;
                            }
                            while listener.recv().await.is_ok() {
                                let _ = tx.send(()).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "PgListener connect failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Resize queue worker pool shutting down");
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &context).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &context).await;
                }
            }
        }

        // Drain: every permit back means every in-flight task has finished.
        let _ = semaphore.acquire_many(config.max_workers as u32).await;
        let _ = stopped_tx.send(true);
        tracing::info!("Resize queue worker pool stopped");
    }

    async fn claim_and_dispatch_one(
        repository: &ResizeTaskRepository,
        semaphore: &Arc<Semaphore>,
        context: &Weak<dyn TaskHandlerContext>,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("No workers available, skipping claim");
                return;
            }
        };

        match repository.claim_next().await {
            Ok(Some(task)) => {
                let repo = repository.clone();
                let ctx = context.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    if let Err(e) = Self::process_task(task, repo, ctx).await {
                        tracing::error!(error = %e, "Task processing failed");
                    }
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No tasks available in queue");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "Failed to claim task from queue");
            }
        }
    }

    #[tracing::instrument(skip(task, repository, context), fields(task.id = %task.id))]
    async fn process_task(
        task: ResizeTask,
        repository: ResizeTaskRepository,
        context: Weak<dyn TaskHandlerContext>,
    ) -> Result<()> {
        let ctx = context
            .upgrade()
            .ok_or_else(|| anyhow::anyhow!("task handler context was dropped"))?;

        match ctx.dispatch_task(&task).await {
            Ok(result) => {
                repository.mark_completed(task.id, result).await?;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retry_count = task.retry_count,
                    max_retries = task.max_retries,
                    "Task execution failed"
                );

                if task.can_retry() {
                    let backoff_seconds = compute_retry_backoff_seconds(task.retry_count);
                    let scheduled_at =
                        Utc::now() + chrono::Duration::seconds(backoff_seconds as i64);
                    repository.retry_later(task.id, scheduled_at).await?;
                    Ok(())
                } else {
                    let error_result = json!({
                        "error": e.to_string(),
                        "retry_count": task.retry_count,
                    });
                    repository.mark_failed(task.id, error_result).await?;
                    Err(e)
                }
            }
        }
    }

    /// Signal the pool to stop claiming and wait until in-flight tasks have
    /// drained.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating resize queue shutdown");
        let _ = self.shutdown_tx.send(()).await;

        let mut stopped = self.stopped_rx.clone();
        while !*stopped.borrow() {
            if stopped.changed().await.is_err() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_backoff_exponential_then_capped() {
        assert_eq!(compute_retry_backoff_seconds(0), 1);
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(10), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn retry_backoff_does_not_overflow_on_large_counts() {
        assert_eq!(compute_retry_backoff_seconds(64), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(i32::MAX), MAX_RETRY_BACKOFF_SECS);
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = ResizeQueueConfig::default();
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.poll_interval_ms, 10_000);
    }
}
