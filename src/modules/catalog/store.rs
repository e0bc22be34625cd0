use crate::modules::catalog::entities::{EpisodeRecord, SeriesMetadata};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Row-store interface for episodes. Writes are upserts keyed by
/// (series, season, episode).
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    async fn upsert(&self, record: &EpisodeRecord) -> AppResult<()>;

    /// All stored episodes of a season, ordered by episode number.
    async fn season_episodes(&self, series_id: &str, season: u32)
        -> AppResult<Vec<EpisodeRecord>>;

    async fn count_for_season(&self, series_id: &str, season: u32) -> AppResult<u32>;

    async fn count_for_series(&self, series_id: &str) -> AppResult<u32>;

    /// Bump the access counter of every episode in a season.
    async fn touch_season(&self, series_id: &str, season: u32) -> AppResult<()>;

    /// Average rating across successfully fetched episodes of a series.
    async fn average_rating(&self, series_id: &str) -> AppResult<Option<f64>>;
}

/// Row-store interface for per-series discovery metadata.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    async fn upsert(&self, metadata: &SeriesMetadata) -> AppResult<()>;

    async fn get(&self, series_id: &str) -> AppResult<Option<SeriesMetadata>>;
}
