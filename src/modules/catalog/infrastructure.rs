//! sqlx-backed implementations of the episode and series stores.

use crate::modules::catalog::entities::{EpisodeRecord, SeriesMetadata};
use crate::modules::catalog::store::{EpisodeStore, SeriesStore};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::database::DbPool;
use async_trait::async_trait;

pub struct SqliteEpisodeStore {
    pool: DbPool,
}

impl SqliteEpisodeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EpisodeStore for SqliteEpisodeStore {
    async fn upsert(&self, record: &EpisodeRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO episodes
                (series_id, season, episode, title, plot, air_date,
                 runtime_minutes, rating, actors, director, writer,
                 poster_url, last_fetched_at, fetch_success, access_count)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(series_id, season, episode) DO UPDATE SET
                title = excluded.title,
                plot = excluded.plot,
                air_date = excluded.air_date,
                runtime_minutes = excluded.runtime_minutes,
                rating = excluded.rating,
                actors = excluded.actors,
                director = excluded.director,
                writer = excluded.writer,
                poster_url = excluded.poster_url,
                last_fetched_at = excluded.last_fetched_at,
                fetch_success = excluded.fetch_success",
        )
        .bind(&record.series_id)
        .bind(record.season)
        .bind(record.episode)
        .bind(&record.title)
        .bind(&record.plot)
        .bind(&record.air_date)
        .bind(record.runtime_minutes)
        .bind(record.rating)
        .bind(&record.actors)
        .bind(&record.director)
        .bind(&record.writer)
        .bind(&record.poster_url)
        .bind(record.last_fetched_at)
        .bind(record.fetch_success)
        .bind(record.access_count)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to upsert episode: {}", e)))?;

        Ok(())
    }

    async fn season_episodes(
        &self,
        series_id: &str,
        season: u32,
    ) -> AppResult<Vec<EpisodeRecord>> {
        let episodes = sqlx::query_as::<_, EpisodeRecord>(
            "SELECT series_id, season, episode, title, plot, air_date,
                    runtime_minutes, rating, actors, director, writer,
                    poster_url, last_fetched_at, fetch_success, access_count
             FROM episodes
             WHERE series_id = ? AND season = ?
             ORDER BY episode ASC",
        )
        .bind(series_id)
        .bind(season)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to load season episodes: {}", e)))?;

        Ok(episodes)
    }

    async fn count_for_season(&self, series_id: &str, season: u32) -> AppResult<u32> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM episodes WHERE series_id = ? AND season = ?",
        )
        .bind(series_id)
        .bind(season)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to count episodes: {}", e)))?;

        Ok(count.0.max(0) as u32)
    }

    async fn count_for_series(&self, series_id: &str) -> AppResult<u32> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM episodes WHERE series_id = ?")
                .bind(series_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to count episodes: {}", e))
                })?;

        Ok(count.0.max(0) as u32)
    }

    async fn touch_season(&self, series_id: &str, season: u32) -> AppResult<()> {
        sqlx::query(
            "UPDATE episodes SET access_count = access_count + 1
             WHERE series_id = ? AND season = ?",
        )
        .bind(series_id)
        .bind(season)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to touch episodes: {}", e)))?;

        Ok(())
    }

    async fn average_rating(&self, series_id: &str) -> AppResult<Option<f64>> {
        let avg: (Option<f64>,) = sqlx::query_as(
            "SELECT AVG(rating) FROM episodes
             WHERE series_id = ? AND rating IS NOT NULL AND fetch_success = 1",
        )
        .bind(series_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to average ratings: {}", e)))?;

        Ok(avg.0)
    }
}

pub struct SqliteSeriesStore {
    pool: DbPool,
}

impl SqliteSeriesStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SeriesStore for SqliteSeriesStore {
    async fn upsert(&self, metadata: &SeriesMetadata) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO series_metadata
                (series_id, title, total_seasons, total_episodes, rating,
                 ttl_days, fully_discovered, last_discovery_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(series_id) DO UPDATE SET
                title = excluded.title,
                total_seasons = excluded.total_seasons,
                total_episodes = excluded.total_episodes,
                rating = excluded.rating,
                ttl_days = excluded.ttl_days,
                fully_discovered = excluded.fully_discovered,
                last_discovery_at = excluded.last_discovery_at",
        )
        .bind(&metadata.series_id)
        .bind(&metadata.title)
        .bind(metadata.total_seasons)
        .bind(metadata.total_episodes)
        .bind(metadata.rating)
        .bind(metadata.ttl_days)
        .bind(metadata.fully_discovered)
        .bind(metadata.last_discovery_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to upsert series: {}", e)))?;

        Ok(())
    }

    async fn get(&self, series_id: &str) -> AppResult<Option<SeriesMetadata>> {
        let metadata = sqlx::query_as::<_, SeriesMetadata>(
            "SELECT series_id, title, total_seasons, total_episodes, rating,
                    ttl_days, fully_discovered, last_discovery_at
             FROM series_metadata
             WHERE series_id = ?",
        )
        .bind(series_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to load series: {}", e)))?;

        Ok(metadata)
    }
}
