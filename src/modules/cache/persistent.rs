//! Slower persistent tier behind the in-memory cache.
//!
//! Entries are keyed rows in the `cache_entries` table; payloads are stored
//! as JSON text. The tier never decides validity on its own — expiry is
//! evaluated by the cache on read and by the periodic sweep.

use crate::modules::cache::entry::CachePriority;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::database::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::time::Duration;

/// A cache entry as held by the persistent tier.
#[derive(Debug, Clone)]
pub struct PersistedEntry {
    pub key: String,
    pub payload: JsonValue,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    pub priority: CachePriority,
    pub access_count: i64,
    pub last_access_at: DateTime<Utc>,
}

impl PersistedEntry {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.remaining_ttl_at(now).is_some()
    }

    /// TTL left at `now`, or None when already expired.
    pub fn remaining_ttl_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let age = now.signed_duration_since(self.created_at);
        let age = age.to_std().unwrap_or(Duration::ZERO);
        if age < self.ttl {
            Some(self.ttl - age)
        } else {
            None
        }
    }
}

#[async_trait]
pub trait PersistentTier: Send + Sync {
    /// Fetch an entry and bump its access counter. Expired entries are still
    /// returned; validity is the caller's call.
    async fn load(&self, key: &str) -> AppResult<Option<PersistedEntry>>;

    /// Insert or replace an entry.
    async fn store(&self, entry: &PersistedEntry) -> AppResult<()>;

    async fn remove(&self, key: &str) -> AppResult<()>;

    /// Delete entries whose TTL has elapsed. Returns how many were removed.
    async fn purge_expired(&self) -> AppResult<u64>;

    /// Under size pressure, delete lowest-priority oldest entries until the
    /// given fraction of the budget is free. Returns how many were removed.
    async fn evict_to_budget(&self, budget: usize, free_fraction: f64) -> AppResult<u64>;

    async fn len(&self) -> AppResult<u64>;
}

#[derive(Debug, FromRow)]
struct CacheEntryRow {
    cache_key: String,
    payload: String,
    created_at: DateTime<Utc>,
    ttl_seconds: i64,
    priority: i64,
    access_count: i64,
    last_access_at: DateTime<Utc>,
}

impl CacheEntryRow {
    fn into_entry(self) -> AppResult<PersistedEntry> {
        let payload: JsonValue = serde_json::from_str(&self.payload)?;
        Ok(PersistedEntry {
            key: self.cache_key,
            payload,
            created_at: self.created_at,
            ttl: Duration::from_secs(self.ttl_seconds.max(0) as u64),
            priority: CachePriority::from_rank(self.priority),
            access_count: self.access_count,
            last_access_at: self.last_access_at,
        })
    }
}

pub struct SqlitePersistentTier {
    pool: DbPool,
}

impl SqlitePersistentTier {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistentTier for SqlitePersistentTier {
    async fn load(&self, key: &str) -> AppResult<Option<PersistedEntry>> {
        let row: Option<CacheEntryRow> = sqlx::query_as(
            "SELECT cache_key, payload, created_at, ttl_seconds, priority,
                    access_count, last_access_at
             FROM cache_entries
             WHERE cache_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(format!("Failed to load cache entry: {}", e)))?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        sqlx::query(
            "UPDATE cache_entries
             SET access_count = access_count + 1, last_access_at = ?
             WHERE cache_key = ?",
        )
        .bind(Utc::now())
        .bind(key)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(format!("Failed to touch cache entry: {}", e)))?;

        row.into_entry().map(Some)
    }

    async fn store(&self, entry: &PersistedEntry) -> AppResult<()> {
        let payload = serde_json::to_string(&entry.payload)?;

        sqlx::query(
            "INSERT INTO cache_entries
                (cache_key, payload, created_at, ttl_seconds, priority,
                 access_count, last_access_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(cache_key) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at,
                ttl_seconds = excluded.ttl_seconds,
                priority = excluded.priority,
                last_access_at = excluded.last_access_at",
        )
        .bind(&entry.key)
        .bind(payload)
        .bind(entry.created_at)
        .bind(entry.ttl.as_secs() as i64)
        .bind(entry.priority.rank())
        .bind(entry.access_count)
        .bind(entry.last_access_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(format!("Failed to store cache entry: {}", e)))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM cache_entries WHERE cache_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::CacheError(format!("Failed to remove cache entry: {}", e)))?;
        Ok(())
    }

    async fn purge_expired(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM cache_entries
             WHERE datetime(created_at, '+' || ttl_seconds || ' seconds')
                   <= datetime(?)",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(format!("Failed to purge cache entries: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn evict_to_budget(&self, budget: usize, free_fraction: f64) -> AppResult<u64> {
        let count = self.len().await?;
        if count <= budget as u64 {
            return Ok(0);
        }

        let keep_target = (budget as f64 * (1.0 - free_fraction.clamp(0.0, 1.0))) as u64;
        let to_remove = count.saturating_sub(keep_target).max(1);

        let result = sqlx::query(
            "DELETE FROM cache_entries
             WHERE cache_key IN (
                 SELECT cache_key FROM cache_entries
                 ORDER BY priority ASC, created_at ASC
                 LIMIT ?
             )",
        )
        .bind(to_remove as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::CacheError(format!("Failed to evict cache entries: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn len(&self) -> AppResult<u64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache_entries")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::CacheError(format!("Failed to count cache entries: {}", e)))?;
        Ok(count.0.max(0) as u64)
    }
}
