//! Repository for the durable resize task queue.

use chrono::{DateTime, Utc};
use picstash_core::models::{ResizeJob, ResizeTask, TaskStatus};
use picstash_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Postgres NOTIFY channel fired on enqueue so idle workers wake immediately
/// instead of waiting for the next poll tick.
pub const TASK_NOTIFY_CHANNEL: &str = "picstash_new_task";

const TASK_COLUMNS: &str = "id, status, payload, result, scheduled_at, started_at, \
     completed_at, retry_count, max_retries, created_at, updated_at";

/// Repository for the `resize_tasks` table.
///
/// Claiming uses `FOR UPDATE SKIP LOCKED` so concurrent workers never pick
/// the same task; a task survives process crashes because it only leaves
/// `pending` inside the claiming transaction.
#[derive(Clone)]
pub struct ResizeTaskRepository {
    pool: PgPool,
}

impl ResizeTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a pending task and notify listening workers. The notify is best
    /// effort; polling picks the task up anyway if it fails.
    #[tracing::instrument(skip(self, job), fields(db.table = "resize_tasks", db.operation = "insert", image_id = %job.image_id))]
    pub async fn enqueue(&self, job: &ResizeJob, max_retries: i32) -> Result<ResizeTask, AppError> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<Postgres, ResizeTask>(&format!(
            r#"
            INSERT INTO resize_tasks (status, payload, scheduled_at, max_retries)
            VALUES ($1, $2, NOW(), $3)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(TaskStatus::Pending)
        .bind(job.to_payload())
        .bind(max_retries)
        .fetch_one(&mut *tx)
        .await?;

        if let Err(e) = sqlx::query("SELECT pg_notify($1, '')")
            .bind(TASK_NOTIFY_CHANNEL)
            .execute(&mut *tx)
            .await
        {
            tracing::warn!(error = %e, "Failed to notify workers of new task");
        }

        tx.commit().await?;

        tracing::info!(task_id = %record.id, "Resize task enqueued");
        Ok(record)
    }

    /// Claim the next runnable task, flipping it to `running` atomically.
    /// Returns `None` when no task is due or every due task is locked by
    /// another worker.
    #[tracing::instrument(skip(self), fields(db.table = "resize_tasks", db.operation = "claim"))]
    pub async fn claim_next(&self) -> Result<Option<ResizeTask>, AppError> {
        let mut tx = self.pool.begin().await?;

        let candidate = sqlx::query_as::<Postgres, ResizeTask>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM resize_tasks
            WHERE status = $1 AND scheduled_at <= NOW()
            ORDER BY scheduled_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        ))
        .bind(TaskStatus::Pending)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(candidate) = candidate else {
            tx.rollback().await.ok();
            return Ok(None);
        };

        let claimed = sqlx::query_as::<Postgres, ResizeTask>(&format!(
            r#"
            UPDATE resize_tasks
            SET status = $2, started_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(candidate.id)
        .bind(TaskStatus::Running)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(task_id = %claimed.id, retry_count = claimed.retry_count, "Task claimed");
        Ok(Some(claimed))
    }

    #[tracing::instrument(skip(self, result), fields(db.table = "resize_tasks", db.operation = "update", db.record_id = %task_id))]
    pub async fn mark_completed(
        &self,
        task_id: Uuid,
        result: serde_json::Value,
    ) -> Result<ResizeTask, AppError> {
        let record = sqlx::query_as::<Postgres, ResizeTask>(&format!(
            r#"
            UPDATE resize_tasks
            SET status = $2, result = $3, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id)
        .bind(TaskStatus::Completed)
        .bind(result)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(task_id = %record.id, "Task completed");
        Ok(record)
    }

    #[tracing::instrument(skip(self, error), fields(db.table = "resize_tasks", db.operation = "update", db.record_id = %task_id))]
    pub async fn mark_failed(
        &self,
        task_id: Uuid,
        error: serde_json::Value,
    ) -> Result<ResizeTask, AppError> {
        let record = sqlx::query_as::<Postgres, ResizeTask>(&format!(
            r#"
            UPDATE resize_tasks
            SET status = $2, result = $3, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id)
        .bind(TaskStatus::Failed)
        .bind(error)
        .fetch_one(&self.pool)
        .await?;

        tracing::error!(task_id = %record.id, retry_count = record.retry_count, "Task failed");
        Ok(record)
    }

    /// Send a failed attempt back to `pending` with a later due time. The
    /// caller computes the backoff; this only records it.
    #[tracing::instrument(skip(self), fields(db.table = "resize_tasks", db.operation = "update", db.record_id = %task_id))]
    pub async fn retry_later(
        &self,
        task_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<ResizeTask, AppError> {
        let record = sqlx::query_as::<Postgres, ResizeTask>(&format!(
            r#"
            UPDATE resize_tasks
            SET status = $2, retry_count = retry_count + 1, started_at = NULL,
                scheduled_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(task_id)
        .bind(TaskStatus::Pending)
        .bind(scheduled_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            task_id = %record.id,
            retry_count = record.retry_count,
            scheduled_at = %record.scheduled_at,
            "Task requeued for retry"
        );
        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "resize_tasks", db.operation = "select", db.record_id = %task_id))]
    pub async fn get_by_id(&self, task_id: Uuid) -> Result<Option<ResizeTask>, AppError> {
        let record = sqlx::query_as::<Postgres, ResizeTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM resize_tasks WHERE id = $1",
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
