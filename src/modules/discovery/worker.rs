//! Background worker that drains the discovery job queue.
//!
//! A single consumer loop: dequeue one job, run it to completion, record the
//! outcome, repeat. Concurrency against the provider comes from the request
//! scheduler underneath, never from running two jobs at once.

use crate::modules::discovery::config::DiscoveryConfig;
use crate::modules::discovery::domain::entities::{JobKind, JobProgress, JobRecord};
use crate::modules::discovery::domain::repository::JobRepository;
use crate::modules::discovery::SeriesWalker;
use crate::shared::errors::{AppError, AppResult};
use crate::{log_error, log_info, log_warn};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The one job currently being processed, exposed for status queries.
#[derive(Debug, Clone)]
pub struct ActiveJob {
    pub job_id: uuid::Uuid,
    pub series_id: String,
    pub kind: String,
    pub started_at: DateTime<Utc>,
}

/// Worker statistics snapshot
#[derive(Debug, Clone)]
pub struct WorkerStatistics {
    pub is_running: bool,
    pub queued_count: i64,
    pub processing_count: i64,
    pub completed_count: i64,
    pub failed_count: i64,
    pub total_count: i64,
}

pub struct DiscoveryWorker {
    jobs: Arc<dyn JobRepository>,
    walker: Arc<SeriesWalker>,
    config: DiscoveryConfig,
    is_running: Arc<RwLock<bool>>,
    active: Arc<RwLock<Option<ActiveJob>>>,
}

impl DiscoveryWorker {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        walker: Arc<SeriesWalker>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            jobs,
            walker,
            config,
            is_running: Arc::new(RwLock::new(false)),
            active: Arc::new(RwLock::new(None)),
        }
    }

    /// Shared handle to the active-job slot, for the status facade.
    pub fn active_slot(&self) -> Arc<RwLock<Option<ActiveJob>>> {
        self.active.clone()
    }

    /// Run the worker loop. Recovers jobs orphaned by a previous crash
    /// before consuming anything new.
    pub async fn run(self: Arc<Self>) {
        log_info!("Discovery worker starting");

        match self.jobs.requeue_stuck(self.config.stuck_job_timeout).await {
            Ok(requeued) if requeued > 0 => {
                log_warn!("Requeued {} jobs stuck in processing", requeued);
            }
            Ok(_) => {}
            Err(e) => log_error!("Failed to requeue stuck jobs: {}", e),
        }

        {
            let mut running = self.is_running.write().await;
            *running = true;
        }

        loop {
            {
                let running = self.is_running.read().await;
                if !*running {
                    break;
                }
            }

            match self.process_next_job().await {
                Ok(true) => {} // A job was processed, check for more right away
                Ok(false) => tokio::time::sleep(self.config.poll_interval).await,
                Err(e) => {
                    log_error!("Worker cycle failed: {}", e);
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        log_info!("Discovery worker stopped");
    }

    pub async fn stop(&self) {
        let mut running = self.is_running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub async fn is_processing(&self) -> bool {
        self.active.read().await.is_some()
    }

    pub async fn statistics(&self) -> AppResult<WorkerStatistics> {
        let queue = self.jobs.statistics().await?;
        Ok(WorkerStatistics {
            is_running: self.is_running().await,
            queued_count: queue.queued_count,
            processing_count: queue.processing_count,
            completed_count: queue.completed_count,
            failed_count: queue.failed_count,
            total_count: queue.total_count,
        })
    }

    /// Process at most one job. Returns whether a job was found.
    async fn process_next_job(&self) -> AppResult<bool> {
        // Single in-flight job: never dequeue while the slot is occupied.
        if self.active.read().await.is_some() {
            return Ok(false);
        }

        let job = match self.jobs.dequeue().await? {
            Some(job) => job,
            None => return Ok(false),
        };

        log_info!(
            "Processing job {} ({} for series {}, attempt {}/{})",
            job.id,
            job.kind,
            job.series_id,
            job.attempts,
            job.max_attempts
        );

        {
            let mut active = self.active.write().await;
            *active = Some(ActiveJob {
                job_id: job.id,
                series_id: job.series_id.clone(),
                kind: job.kind.clone(),
                started_at: Utc::now(),
            });
        }

        let outcome = AssertUnwindSafe(self.execute_job(&job)).catch_unwind().await;

        // The slot is cleared no matter how the job ended, panics included.
        {
            let mut active = self.active.write().await;
            *active = None;
        }

        match outcome {
            Ok(Ok(progress)) => {
                self.jobs.mark_completed(job.id, &progress).await?;
                log_info!(
                    "Job {} completed: {} seasons, {} episodes",
                    job.id,
                    progress.total_seasons,
                    progress.total_episodes
                );
            }
            Ok(Err(e)) => {
                let message = e.to_string();
                if job.can_retry() {
                    log_warn!("Job {} failed, will retry: {}", job.id, message);
                } else {
                    log_error!("Job {} failed permanently: {}", job.id, message);
                }
                self.jobs.mark_failed(job.id, &message).await?;
            }
            Err(_) => {
                log_error!("Job {} panicked mid-execution", job.id);
                self.jobs
                    .mark_failed(job.id, "Job panicked mid-execution")
                    .await?;
            }
        }

        Ok(true)
    }

    async fn execute_job(&self, job: &JobRecord) -> AppResult<JobProgress> {
        let kind = job
            .parse_kind()
            .map_err(AppError::InvalidInput)?;

        match kind {
            JobKind::FullSeries => self.walker.discover_series(&job.series_id).await,
            JobKind::FullSeason => {
                let season = job.season.ok_or_else(|| {
                    AppError::InvalidInput("full_season job is missing a season".to_string())
                })?;
                self.walker.discover_season(&job.series_id, season).await
            }
            JobKind::SingleEpisode => {
                let season = job.season.ok_or_else(|| {
                    AppError::InvalidInput("single_episode job is missing a season".to_string())
                })?;
                let episode = job.episode.ok_or_else(|| {
                    AppError::InvalidInput("single_episode job is missing an episode".to_string())
                })?;
                self.walker
                    .discover_episode(&job.series_id, season, episode)
                    .await
            }
        }
    }
}
