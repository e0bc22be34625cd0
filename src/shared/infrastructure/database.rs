use crate::log_info;
use crate::shared::errors::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = SqlitePool;

/// Thin wrapper around the SQLite connection pool.
///
/// The subsystem treats the relational store as a small set of row
/// operations, so schema bootstrap happens here rather than through a
/// migration toolchain.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect to the given SQLite URL and ensure the schema exists.
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        Self::connect_with(database_url, 5).await
    }

    /// Private in-memory database, mainly for tests. A single connection is
    /// required because every `sqlite::memory:` connection is its own database.
    pub async fn in_memory() -> AppResult<Self> {
        Self::connect_with("sqlite::memory:", 1).await
    }

    async fn connect_with(database_url: &str, max_connections: u32) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::DatabaseError(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to create connection pool: {}", e))
            })?;

        create_schema(&pool).await?;

        log_info!(
            "Database pool initialized (max_connections: {})",
            max_connections
        );

        Ok(Self { pool })
    }

    /// Create a Database instance from an existing pool (useful for testing)
    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Idempotent schema bootstrap for the job table, episode store, series
/// metadata store and the persistent cache tier.
pub async fn create_schema(pool: &DbPool) -> AppResult<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS discovery_jobs (
            id            TEXT PRIMARY KEY,
            series_id     TEXT NOT NULL,
            season        INTEGER,
            episode       INTEGER,
            kind          TEXT NOT NULL,
            priority      INTEGER NOT NULL DEFAULT 0,
            status        TEXT NOT NULL DEFAULT 'queued',
            attempts      INTEGER NOT NULL DEFAULT 0,
            max_attempts  INTEGER NOT NULL DEFAULT 3,
            progress      TEXT,
            error         TEXT,
            created_at    TEXT NOT NULL,
            started_at    TEXT,
            completed_at  TEXT
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_discovery_jobs_dequeue
            ON discovery_jobs (status, priority, created_at)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS episodes (
            series_id       TEXT NOT NULL,
            season          INTEGER NOT NULL,
            episode         INTEGER NOT NULL,
            title           TEXT NOT NULL,
            plot            TEXT,
            air_date        TEXT,
            runtime_minutes INTEGER,
            rating          REAL,
            actors          TEXT,
            director        TEXT,
            writer          TEXT,
            poster_url      TEXT,
            last_fetched_at TEXT NOT NULL,
            fetch_success   INTEGER NOT NULL DEFAULT 1,
            access_count    INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (series_id, season, episode)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS series_metadata (
            series_id         TEXT PRIMARY KEY,
            title             TEXT NOT NULL,
            total_seasons     INTEGER NOT NULL DEFAULT 0,
            total_episodes    INTEGER NOT NULL DEFAULT 0,
            rating            REAL,
            ttl_days          INTEGER NOT NULL,
            fully_discovered  INTEGER NOT NULL DEFAULT 0,
            last_discovery_at TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS cache_entries (
            cache_key      TEXT PRIMARY KEY,
            payload        TEXT NOT NULL,
            created_at     TEXT NOT NULL,
            ttl_seconds    INTEGER NOT NULL,
            priority       INTEGER NOT NULL DEFAULT 1,
            access_count   INTEGER NOT NULL DEFAULT 0,
            last_access_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_cache_entries_eviction
            ON cache_entries (priority, created_at)
        "#,
    ];

    for statement in statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Schema bootstrap failed: {}", e)))?;
    }

    Ok(())
}
