use crate::modules::provider::EpisodeData;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A cached episode, keyed by (series, season, episode). Writes are always
/// upserts on that natural key, so re-discovery never duplicates rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EpisodeRecord {
    pub series_id: String,
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub plot: Option<String>,
    pub air_date: Option<String>,
    pub runtime_minutes: Option<i64>,
    pub rating: Option<f64>,
    pub actors: Option<String>,
    pub director: Option<String>,
    pub writer: Option<String>,
    pub poster_url: Option<String>,
    pub last_fetched_at: DateTime<Utc>,
    pub fetch_success: bool,
    pub access_count: i64,
}

impl EpisodeRecord {
    pub fn from_provider(
        series_id: &str,
        season: u32,
        episode: u32,
        data: EpisodeData,
    ) -> Self {
        Self {
            series_id: series_id.to_string(),
            season,
            episode,
            title: data.title,
            plot: data.plot,
            air_date: data.air_date,
            runtime_minutes: data.runtime_minutes,
            rating: data.rating,
            actors: data.actors,
            director: data.director,
            writer: data.writer,
            poster_url: data.poster_url,
            last_fetched_at: Utc::now(),
            fetch_success: true,
            access_count: 0,
        }
    }
}

/// Per-series discovery bookkeeping: season/episode totals, the source
/// rating and the rating-derived refresh TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SeriesMetadata {
    pub series_id: String,
    pub title: String,
    pub total_seasons: u32,
    pub total_episodes: u32,
    pub rating: Option<f64>,
    pub ttl_days: i64,
    pub fully_discovered: bool,
    pub last_discovery_at: Option<DateTime<Utc>>,
}

impl SeriesMetadata {
    /// Fresh means fully discovered and still inside the TTL window.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        if !self.fully_discovered {
            return false;
        }
        match self.last_discovery_at {
            Some(discovered) => now - discovered < ChronoDuration::days(self.ttl_days),
            None => false,
        }
    }
}
