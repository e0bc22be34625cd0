//! Season/episode discovery walk.
//!
//! The provider has no "how many episodes does season N have?" endpoint, so
//! discovery probes sequentially: episodes within a season until a run of
//! consecutive misses, seasons until a run of consecutive empty seasons.
//! Every fetch goes through the request scheduler at background priority so
//! interactive lookups are never starved.

use crate::modules::catalog::entities::{EpisodeRecord, SeriesMetadata};
use crate::modules::catalog::store::{EpisodeStore, SeriesStore};
use crate::modules::discovery::config::DiscoveryConfig;
use crate::modules::discovery::domain::entities::JobProgress;
use crate::modules::discovery::ttl::calculate_ttl_days;
use crate::modules::provider::{FetchOutcome, MetadataProvider};
use crate::modules::scheduler::RequestScheduler;
use crate::shared::errors::AppResult;
use crate::{log_debug, log_info, log_warn};
use chrono::Utc;
use std::sync::Arc;

pub struct SeriesWalker {
    provider: Arc<dyn MetadataProvider>,
    scheduler: Arc<RequestScheduler>,
    episodes: Arc<dyn EpisodeStore>,
    series: Arc<dyn SeriesStore>,
    config: DiscoveryConfig,
}

impl SeriesWalker {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        scheduler: Arc<RequestScheduler>,
        episodes: Arc<dyn EpisodeStore>,
        series: Arc<dyn SeriesStore>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            provider,
            scheduler,
            episodes,
            series,
            config,
        }
    }

    /// Walk every season of a series, then finalize its metadata: episode
    /// totals, the average rating and the rating-derived refresh TTL.
    ///
    /// The walk resumes rather than refetches: seasons that already have
    /// stored episodes are counted from the store and skipped, so a job
    /// retried after a mid-walk failure only pays for what is missing.
    pub async fn discover_series(&self, series_id: &str) -> AppResult<JobProgress> {
        log_info!("Starting series discovery for {}", series_id);

        self.initialize_series(series_id).await?;

        let mut total_seasons = 0u32;
        let mut total_episodes = 0u32;
        let mut consecutive_empty = 0u32;

        for season in 1..=self.config.max_seasons {
            let already_stored = self.episodes.count_for_season(series_id, season).await?;
            let found = if already_stored > 0 {
                log_debug!(
                    "Season {} of {} already has {} episodes, skipping fetch",
                    season,
                    series_id,
                    already_stored
                );
                already_stored
            } else {
                self.walk_season(series_id, season).await?
            };

            if found == 0 {
                consecutive_empty += 1;
                if consecutive_empty >= self.config.empty_season_threshold {
                    log_debug!(
                        "Stopping series walk for {} after {} empty seasons",
                        series_id,
                        consecutive_empty
                    );
                    break;
                }
            } else {
                consecutive_empty = 0;
                total_seasons = season;
                total_episodes += found;
            }
        }

        self.finalize_series(series_id, total_seasons, total_episodes)
            .await?;

        log_info!(
            "Series discovery for {} finished: {} seasons, {} episodes",
            series_id,
            total_seasons,
            total_episodes
        );

        Ok(JobProgress {
            total_seasons,
            total_episodes,
        })
    }

    /// Walk a single season. Upserts are idempotent, so re-running over a
    /// season that is already stored only refreshes its episodes.
    pub async fn discover_season(&self, series_id: &str, season: u32) -> AppResult<JobProgress> {
        let found = self.walk_season(series_id, season).await?;
        Ok(JobProgress {
            total_seasons: u32::from(found > 0),
            total_episodes: found,
        })
    }

    /// Refresh exactly one episode.
    pub async fn discover_episode(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
    ) -> AppResult<JobProgress> {
        let found = match self.fetch_episode(series_id, season, episode).await? {
            FetchOutcome::Found(data) => {
                let record = EpisodeRecord::from_provider(series_id, season, episode, data);
                self.episodes.upsert(&record).await?;
                1
            }
            FetchOutcome::NotFound => 0,
        };

        Ok(JobProgress {
            total_seasons: 0,
            total_episodes: found,
        })
    }

    /// Probe episodes 1..=max until a run of consecutive misses. Transient
    /// provider errors count as misses for termination, but are logged so a
    /// retried job can fill the gap later.
    async fn walk_season(&self, series_id: &str, season: u32) -> AppResult<u32> {
        let mut found = 0u32;
        let mut consecutive_misses = 0u32;

        for episode in 1..=self.config.max_episodes_per_season {
            match self.fetch_episode(series_id, season, episode).await {
                Ok(FetchOutcome::Found(data)) => {
                    let record = EpisodeRecord::from_provider(series_id, season, episode, data);
                    self.episodes.upsert(&record).await?;
                    found += 1;
                    consecutive_misses = 0;
                }
                Ok(FetchOutcome::NotFound) => {
                    consecutive_misses += 1;
                }
                Err(e) => {
                    log_warn!(
                        "Transient failure fetching {} S{}E{}: {}",
                        series_id,
                        season,
                        episode,
                        e
                    );
                    consecutive_misses += 1;
                }
            }

            if consecutive_misses >= self.config.consecutive_miss_threshold {
                break;
            }
        }

        log_debug!(
            "Season {} of {} walked: {} episodes found",
            season,
            series_id,
            found
        );
        Ok(found)
    }

    /// One provider fetch, routed through the scheduler at background
    /// priority.
    async fn fetch_episode(
        &self,
        series_id: &str,
        season: u32,
        episode: u32,
    ) -> AppResult<FetchOutcome> {
        let provider = self.provider.clone();
        let series_id = series_id.to_string();
        self.scheduler
            .submit_background(
                async move { provider.fetch_episode(&series_id, season, episode).await },
            )
            .await
    }

    /// Mark the series as under discovery, stamping the attempt time and
    /// preserving whatever was already known about it.
    async fn initialize_series(&self, series_id: &str) -> AppResult<()> {
        let existing = self.series.get(series_id).await?;
        let seeded = match existing {
            Some(metadata) => SeriesMetadata {
                fully_discovered: false,
                last_discovery_at: Some(Utc::now()),
                ..metadata
            },
            None => SeriesMetadata {
                series_id: series_id.to_string(),
                title: series_id.to_string(),
                total_seasons: 0,
                total_episodes: 0,
                rating: None,
                ttl_days: calculate_ttl_days(None),
                fully_discovered: false,
                last_discovery_at: Some(Utc::now()),
            },
        };
        self.series.upsert(&seeded).await
    }

    async fn finalize_series(
        &self,
        series_id: &str,
        total_seasons: u32,
        total_episodes: u32,
    ) -> AppResult<()> {
        let rating = self.episodes.average_rating(series_id).await?;
        let ttl_days = calculate_ttl_days(rating);

        let title = match self.series.get(series_id).await? {
            Some(existing) if !existing.title.is_empty() => existing.title,
            _ => series_id.to_string(),
        };

        self.series
            .upsert(&SeriesMetadata {
                series_id: series_id.to_string(),
                title,
                total_seasons,
                total_episodes,
                rating,
                ttl_days,
                fully_discovered: true,
                last_discovery_at: Some(Utc::now()),
            })
            .await
    }
}
