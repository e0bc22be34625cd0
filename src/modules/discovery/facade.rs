//! Read-mostly facade over discovery state: series freshness, season
//! episode listings and queue status. This is the surface the UI layer
//! talks to.

use crate::log_debug;
use crate::modules::cache::{CachePriority, CacheWriteOptions, SmartCache};
use crate::modules::catalog::entities::{EpisodeRecord, SeriesMetadata};
use crate::modules::catalog::store::{EpisodeStore, SeriesStore};
use crate::modules::discovery::domain::entities::{JobRecord, NewJob};
use crate::modules::discovery::domain::repository::JobRepository;
use crate::modules::discovery::ttl::DEFAULT_TTL_DAYS;
use crate::modules::discovery::worker::ActiveJob;
use crate::shared::errors::AppResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Freshness summary for one series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesStatus {
    /// Fully discovered and still inside its TTL window
    pub cached: bool,
    pub total_seasons: u32,
    pub total_episodes: u32,
    pub last_updated: Option<DateTime<Utc>>,
    /// A discovery job for this series is queued or processing
    pub is_being_fetched: bool,
}

/// Queue summary for monitoring views.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub queue_length: i64,
    pub is_processing: bool,
    /// Series id of the job currently being processed, if any
    pub currently_processing: Option<String>,
}

pub struct SeriesStatusService {
    jobs: Arc<dyn JobRepository>,
    episodes: Arc<dyn EpisodeStore>,
    series: Arc<dyn SeriesStore>,
    cache: Arc<SmartCache>,
    active: Arc<RwLock<Option<ActiveJob>>>,
}

impl SeriesStatusService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        episodes: Arc<dyn EpisodeStore>,
        series: Arc<dyn SeriesStore>,
        cache: Arc<SmartCache>,
        active: Arc<RwLock<Option<ActiveJob>>>,
    ) -> Self {
        Self {
            jobs,
            episodes,
            series,
            cache,
            active,
        }
    }

    /// Queue a full-series discovery unless the series is already fresh or
    /// already has an active job. Returns the queued job, or None when
    /// nothing needed doing.
    pub async fn enqueue_discovery(
        &self,
        series_id: &str,
        title: &str,
        priority: i64,
    ) -> AppResult<Option<JobRecord>> {
        let status = self.get_series_status(series_id).await?;
        if status.cached {
            log_debug!("Series {} is fresh, skipping discovery", series_id);
            return Ok(None);
        }
        if status.is_being_fetched {
            log_debug!("Series {} already has an active job", series_id);
            return Ok(None);
        }

        // Seed the metadata row so the title survives until the walk
        // finalizes it.
        if self.series.get(series_id).await?.is_none() {
            self.series
                .upsert(&SeriesMetadata {
                    series_id: series_id.to_string(),
                    title: title.to_string(),
                    total_seasons: 0,
                    total_episodes: 0,
                    rating: None,
                    ttl_days: DEFAULT_TTL_DAYS,
                    fully_discovered: false,
                    last_discovery_at: None,
                })
                .await?;
        }

        let job = self
            .jobs
            .enqueue(NewJob::full_series(series_id, priority))
            .await?;
        log_debug!("Enqueued discovery job {} for series {}", job.id, series_id);
        Ok(Some(job))
    }

    pub async fn get_series_status(&self, series_id: &str) -> AppResult<SeriesStatus> {
        let metadata = self.series.get(series_id).await?;
        let is_being_fetched = self.jobs.has_active_job_for_series(series_id).await?;

        Ok(match metadata {
            Some(m) => SeriesStatus {
                cached: m.is_fresh_at(Utc::now()),
                total_seasons: m.total_seasons,
                total_episodes: m.total_episodes,
                last_updated: m.last_discovery_at,
                is_being_fetched,
            },
            None => SeriesStatus {
                cached: false,
                total_seasons: 0,
                total_episodes: 0,
                last_updated: None,
                is_being_fetched,
            },
        })
    }

    /// Episodes of one season, cache-first. Returns None when the season has
    /// no stored episodes (not yet discovered, or genuinely absent).
    pub async fn get_season_episodes(
        &self,
        series_id: &str,
        season: u32,
    ) -> AppResult<Option<Vec<EpisodeRecord>>> {
        let key = season_cache_key(series_id, season);

        if let Some(episodes) = self.cache.get::<Vec<EpisodeRecord>>(&key).await? {
            if !episodes.is_empty() {
                self.episodes.touch_season(series_id, season).await?;
                return Ok(Some(episodes));
            }
        }

        let stored = self.episodes.season_episodes(series_id, season).await?;
        if stored.is_empty() {
            return Ok(None);
        }

        self.episodes.touch_season(series_id, season).await?;

        // Cache with the series' rating-derived TTL so popular shows stay
        // hot longer.
        let ttl_days = self
            .series
            .get(series_id)
            .await?
            .map(|m| m.ttl_days)
            .unwrap_or(DEFAULT_TTL_DAYS);
        self.cache
            .set(
                &key,
                &stored,
                CacheWriteOptions {
                    ttl: Duration::from_secs(ttl_days.max(0) as u64 * 86_400),
                    persist: true,
                    priority: CachePriority::Normal,
                },
            )
            .await?;

        Ok(Some(stored))
    }

    pub async fn get_queue_status(&self) -> AppResult<QueueStatus> {
        let stats = self.jobs.statistics().await?;
        let active = self.active.read().await.clone();

        Ok(QueueStatus {
            queue_length: stats.queued_count,
            is_processing: active.is_some(),
            currently_processing: active.map(|job| job.series_id),
        })
    }
}

fn season_cache_key(series_id: &str, season: u32) -> String {
    format!("episodes:{}:{}", series_id, season)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_includes_series_and_season() {
        assert_eq!(season_cache_key("tt0903747", 2), "episodes:tt0903747:2");
    }
}
