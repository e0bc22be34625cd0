//! sqlx-backed implementation of the job repository.
//!
//! The queue lives in a single `discovery_jobs` table. Dequeue uses one
//! UPDATE ... RETURNING statement so pick and claim happen atomically even
//! though SQLite has no row locks.

use crate::log_debug;
use crate::modules::discovery::domain::entities::{JobProgress, JobRecord, NewJob};
use crate::modules::discovery::domain::repository::{JobRepository, QueueStatistics};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::database::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::FromRow;
use std::time::Duration;
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, series_id, season, episode, kind, priority, status, \
     attempts, max_attempts, progress, error, created_at, started_at, completed_at";

#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    series_id: String,
    season: Option<u32>,
    episode: Option<u32>,
    kind: String,
    priority: i64,
    status: String,
    attempts: i64,
    max_attempts: i64,
    progress: Option<String>,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    fn into_record(self) -> AppResult<JobRecord> {
        let progress = self
            .progress
            .as_deref()
            .and_then(|raw| serde_json::from_str::<JobProgress>(raw).ok());

        Ok(JobRecord {
            id: Uuid::parse_str(&self.id)?,
            series_id: self.series_id,
            season: self.season,
            episode: self.episode,
            kind: self.kind,
            priority: self.priority,
            status: self.status,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            progress,
            error: self.error,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        })
    }
}

pub struct SqliteJobRepository {
    pool: DbPool,
}

impl SqliteJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_equivalent_active(&self, job: &NewJob) -> AppResult<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM discovery_jobs
             WHERE series_id = ?
               AND kind = ?
               AND COALESCE(season, -1) = COALESCE(?, -1)
               AND COALESCE(episode, -1) = COALESCE(?, -1)
               AND status IN ('queued', 'processing')
             LIMIT 1"
        ))
        .bind(&job.series_id)
        .bind(job.kind.to_string())
        .bind(job.season)
        .bind(job.episode)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to check for duplicate job: {}", e)))?;

        row.map(JobRow::into_record).transpose()
    }
}

#[async_trait]
impl JobRepository for SqliteJobRepository {
    async fn enqueue(&self, job: NewJob) -> AppResult<JobRecord> {
        if let Some(existing) = self.find_equivalent_active(&job).await? {
            log_debug!(
                "Job for series {} ({}) already active, returning existing {}",
                job.series_id,
                job.kind,
                existing.id
            );
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        let created_at = Utc::now();

        sqlx::query(
            "INSERT INTO discovery_jobs
                (id, series_id, season, episode, kind, priority, status,
                 attempts, max_attempts, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 'queued', 0, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&job.series_id)
        .bind(job.season)
        .bind(job.episode)
        .bind(job.kind.to_string())
        .bind(job.priority)
        .bind(job.max_attempts)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to enqueue job: {}", e)))?;

        Ok(JobRecord {
            id,
            series_id: job.series_id,
            season: job.season,
            episode: job.episode,
            kind: job.kind.to_string(),
            priority: job.priority,
            status: "queued".to_string(),
            attempts: 0,
            max_attempts: job.max_attempts,
            progress: None,
            error: None,
            created_at,
            started_at: None,
            completed_at: None,
        })
    }

    async fn dequeue(&self) -> AppResult<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "UPDATE discovery_jobs
             SET status = 'processing', started_at = ?, attempts = attempts + 1
             WHERE id = (
                 SELECT id FROM discovery_jobs
                 WHERE status = 'queued' AND attempts < max_attempts
                 ORDER BY priority DESC, created_at ASC
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to dequeue job: {}", e)))?;

        row.map(JobRow::into_record).transpose()
    }

    async fn mark_completed(&self, job_id: Uuid, progress: &JobProgress) -> AppResult<()> {
        let payload = serde_json::to_string(progress)?;

        sqlx::query(
            "UPDATE discovery_jobs
             SET status = 'completed', completed_at = ?, progress = ?, error = NULL
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(payload)
        .bind(job_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to complete job: {}", e)))?;

        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        // Attempts were already bumped at dequeue time. Jobs with retries
        // left go back on the queue; the rest fail terminally.
        sqlx::query(
            "UPDATE discovery_jobs
             SET status = CASE WHEN attempts < max_attempts THEN 'queued' ELSE 'failed' END,
                 completed_at = CASE WHEN attempts < max_attempts THEN NULL ELSE ? END,
                 started_at = NULL,
                 error = ?
             WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(error)
        .bind(job_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fail job: {}", e)))?;

        Ok(())
    }

    async fn requeue_stuck(&self, older_than: Duration) -> AppResult<u64> {
        let cutoff = Utc::now()
            - ChronoDuration::from_std(older_than).unwrap_or_else(|_| ChronoDuration::minutes(10));

        let result = sqlx::query(
            "UPDATE discovery_jobs
             SET status = 'queued', started_at = NULL,
                 error = 'Requeued after exceeding the processing timeout'
             WHERE status = 'processing'
               AND started_at IS NOT NULL
               AND datetime(started_at) < datetime(?)",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to requeue stuck jobs: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM discovery_jobs WHERE id = ?"
        ))
        .bind(job_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to load job: {}", e)))?;

        row.map(JobRow::into_record).transpose()
    }

    async fn queued_jobs(&self) -> AppResult<Vec<JobRecord>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM discovery_jobs
             WHERE status = 'queued'
             ORDER BY priority DESC, created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list queued jobs: {}", e)))?;

        rows.into_iter().map(JobRow::into_record).collect()
    }

    async fn has_active_job_for_series(&self, series_id: &str) -> AppResult<bool> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM discovery_jobs
             WHERE series_id = ? AND status IN ('queued', 'processing')",
        )
        .bind(series_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to check active jobs: {}", e)))?;

        Ok(count.0 > 0)
    }

    async fn jobs_for_series(&self, series_id: &str) -> AppResult<Vec<JobRecord>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM discovery_jobs
             WHERE series_id = ?
             ORDER BY created_at DESC"
        ))
        .bind(series_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list series jobs: {}", e)))?;

        rows.into_iter().map(JobRow::into_record).collect()
    }

    async fn delete_old_completed(&self, days: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - ChronoDuration::days(days);

        let result = sqlx::query(
            "DELETE FROM discovery_jobs
             WHERE status IN ('completed', 'failed')
               AND completed_at IS NOT NULL
               AND datetime(completed_at) < datetime(?)",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to delete old jobs: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn statistics(&self) -> AppResult<QueueStatistics> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM discovery_jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to load queue statistics: {}", e)))?;

        let mut stats = QueueStatistics::default();
        for (status, count) in rows {
            stats.total_count += count;
            match status.as_str() {
                "queued" => stats.queued_count = count,
                "processing" => stats.processing_count = count,
                "completed" => stats.completed_count = count,
                "failed" => stats.failed_count = count,
                _ => {}
            }
        }

        Ok(stats)
    }
}
