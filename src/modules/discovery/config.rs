use std::time::Duration;

/// Tuning knobs for the discovery worker and the season/episode walk.
///
/// The probe bounds and miss thresholds are load-bearing: they are what keeps
/// a full-series walk from issuing unbounded requests against a provider that
/// has no "how many episodes?" endpoint.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// How often the worker polls an empty queue
    pub poll_interval: Duration,
    /// Jobs stuck in `processing` longer than this get requeued on startup
    pub stuck_job_timeout: Duration,
    /// Upper bound on season numbers probed during a full-series walk
    pub max_seasons: u32,
    /// Upper bound on episode numbers probed within one season
    pub max_episodes_per_season: u32,
    /// Consecutive in-season misses before the season is considered finished
    pub consecutive_miss_threshold: u32,
    /// Consecutive empty seasons before the series walk terminates
    pub empty_season_threshold: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            stuck_job_timeout: Duration::from_secs(600),
            max_seasons: 20,
            max_episodes_per_season: 50,
            consecutive_miss_threshold: 3,
            empty_season_threshold: 2,
        }
    }
}
