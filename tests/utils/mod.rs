#![allow(dead_code)]

//! Shared helpers for integration tests: an in-memory stack and a scripted
//! provider standing in for the real metadata API.

use async_trait::async_trait;
use showvault::modules::cache::CacheConfig;
use showvault::modules::discovery::DiscoveryConfig;
use showvault::modules::provider::{EpisodeData, FetchOutcome, MetadataProvider};
use showvault::modules::scheduler::SchedulerConfig;
use showvault::shared::errors::{AppError, AppResult};
use showvault::shared::infrastructure::database::Database;
use showvault::AppServices;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Provider fake driven by a season -> episode-count script. Seasons not in
/// the script are empty; `fail_always` turns every fetch into a transient
/// error.
pub struct ScriptedProvider {
    seasons: HashMap<u32, u32>,
    rating: f64,
    fail_always: bool,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(seasons: &[(u32, u32)]) -> Self {
        Self {
            seasons: seasons.iter().copied().collect(),
            rating: 8.0,
            fail_always: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            seasons: HashMap::new(),
            rating: 0.0,
            fail_always: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    /// Add per-fetch latency, useful for observing in-flight state.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for ScriptedProvider {
    async fn fetch_episode(
        &self,
        _series_id: &str,
        season: u32,
        episode: u32,
    ) -> AppResult<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_always {
            return Err(AppError::ExternalServiceError(
                "scripted provider failure".to_string(),
            ));
        }

        let episodes_in_season = self.seasons.get(&season).copied().unwrap_or(0);
        if episode <= episodes_in_season {
            Ok(FetchOutcome::Found(EpisodeData {
                title: format!("Episode {}", episode),
                plot: Some("Scripted plot".to_string()),
                air_date: Some("2020-01-01".to_string()),
                runtime_minutes: Some(45),
                rating: Some(self.rating),
                actors: None,
                director: None,
                writer: None,
                poster_url: None,
            }))
        } else {
            Ok(FetchOutcome::NotFound)
        }
    }
}

/// Scheduler tuned so tests finish quickly.
pub fn fast_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        max_concurrent: 2,
        min_request_delay: Duration::from_millis(1),
    }
}

/// Discovery config with a short poll so the worker reacts within tests.
pub fn fast_discovery_config() -> DiscoveryConfig {
    DiscoveryConfig {
        poll_interval: Duration::from_millis(20),
        ..DiscoveryConfig::default()
    }
}

/// Full service stack over an in-memory database and a scripted provider.
pub async fn build_services(provider: ScriptedProvider) -> AppServices {
    let db = Database::in_memory().await.expect("in-memory database");
    AppServices::build(
        db,
        Arc::new(provider),
        fast_scheduler_config(),
        CacheConfig::default(),
        fast_discovery_config(),
    )
}

/// Poll `check` every 20ms until it returns true or the timeout elapses.
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
