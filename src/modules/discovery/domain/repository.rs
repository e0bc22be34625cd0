/// Repository trait for job persistence.
use crate::modules::discovery::domain::entities::{JobProgress, JobRecord, NewJob};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Enqueue a new job. When an equivalent job (same series/season/episode
    /// and kind) is already queued or processing, the existing record is
    /// returned instead of inserting a duplicate.
    async fn enqueue(&self, job: NewJob) -> AppResult<JobRecord>;

    /// Dequeue the next queued job: highest priority first, oldest within a
    /// priority, attempts below the retry ceiling. Marks it `processing`,
    /// stamps `started_at` and increments attempts. Returns None when the
    /// queue is empty.
    async fn dequeue(&self) -> AppResult<Option<JobRecord>>;

    /// Mark a job as completed with its discovered counts.
    async fn mark_completed(&self, job_id: Uuid, progress: &JobProgress) -> AppResult<()>;

    /// Mark a job as failed. Jobs with attempts left go back to `queued` for
    /// the next cycle; exhausted jobs become terminally `failed`.
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()>;

    /// Startup sweep: any job stuck in `processing` longer than `older_than`
    /// is reset to `queued` with attempts preserved and an explanatory error.
    /// Returns how many jobs were requeued.
    async fn requeue_stuck(&self, older_than: Duration) -> AppResult<u64>;

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>>;

    /// All queued jobs in dequeue order (for monitoring)
    async fn queued_jobs(&self) -> AppResult<Vec<JobRecord>>;

    /// Whether any job for the series is queued or processing.
    async fn has_active_job_for_series(&self, series_id: &str) -> AppResult<bool>;

    /// All jobs for a series, newest first (for UI progress tracking)
    async fn jobs_for_series(&self, series_id: &str) -> AppResult<Vec<JobRecord>>;

    /// Delete completed/failed jobs older than the given number of days.
    async fn delete_old_completed(&self, days: i64) -> AppResult<u64>;

    async fn statistics(&self) -> AppResult<QueueStatistics>;
}

/// Job queue statistics
#[derive(Debug, Clone, Default)]
pub struct QueueStatistics {
    pub queued_count: i64,
    pub processing_count: i64,
    pub completed_count: i64,
    pub failed_count: i64,
    pub total_count: i64,
}
