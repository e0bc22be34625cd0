//! Service wiring: builds the scheduler, cache, stores, walker, worker and
//! status facade on top of one database pool, and owns their lifecycle.

use crate::modules::cache::{CacheConfig, CompositePolicy, SmartCache, SqlitePersistentTier};
use crate::modules::catalog::{SqliteEpisodeStore, SqliteSeriesStore};
use crate::log_info;
use crate::modules::discovery::{
    DiscoveryConfig, DiscoveryWorker, JobRepository, SeriesStatusService, SeriesWalker,
    SqliteJobRepository,
};
use crate::modules::provider::{MetadataProvider, OmdbClient};
use crate::modules::scheduler::{RequestScheduler, SchedulerConfig};
use crate::shared::config::AppConfig;
use crate::shared::errors::AppResult;
use crate::shared::infrastructure::database::Database;
use std::sync::Arc;

pub struct AppServices {
    pub db: Database,
    pub scheduler: Arc<RequestScheduler>,
    pub cache: Arc<SmartCache>,
    pub jobs: Arc<dyn JobRepository>,
    pub worker: Arc<DiscoveryWorker>,
    pub status: Arc<SeriesStatusService>,
}

impl AppServices {
    /// Wire every service on top of an existing database and provider.
    pub fn build(
        db: Database,
        provider: Arc<dyn MetadataProvider>,
        scheduler_config: SchedulerConfig,
        cache_config: CacheConfig,
        discovery_config: DiscoveryConfig,
    ) -> Self {
        let pool = db.pool().clone();

        let scheduler = Arc::new(RequestScheduler::new(scheduler_config));
        let cache = Arc::new(SmartCache::new(
            cache_config,
            Arc::new(SqlitePersistentTier::new(pool.clone())),
            Box::new(CompositePolicy::default()),
        ));

        let jobs: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(pool.clone()));
        let episodes = Arc::new(SqliteEpisodeStore::new(pool.clone()));
        let series = Arc::new(SqliteSeriesStore::new(pool));

        let walker = Arc::new(SeriesWalker::new(
            provider,
            scheduler.clone(),
            episodes.clone(),
            series.clone(),
            discovery_config.clone(),
        ));

        let worker = Arc::new(DiscoveryWorker::new(
            jobs.clone(),
            walker,
            discovery_config,
        ));

        let status = Arc::new(SeriesStatusService::new(
            jobs.clone(),
            episodes,
            series,
            cache.clone(),
            worker.active_slot(),
        ));

        Self {
            db,
            scheduler,
            cache,
            jobs,
            worker,
            status,
        }
    }

    /// Bootstrap from environment configuration with default tuning.
    pub async fn bootstrap() -> AppResult<Self> {
        crate::shared::utils::init_logger();

        let config = AppConfig::from_env()?;
        let db = Database::connect(&config.database_url).await?;
        let provider = Arc::new(OmdbClient::new(
            config.omdb_api_key.clone(),
            config.omdb_base_url.clone(),
        ));

        Ok(Self::build(
            db,
            provider,
            SchedulerConfig::default(),
            CacheConfig::default(),
            DiscoveryConfig::default(),
        ))
    }

    /// Start the scheduler dispatcher and the discovery worker.
    pub fn start(&self) {
        self.scheduler.start();
        tokio::spawn(self.worker.clone().run());
        log_info!("Application services started");
    }

    pub async fn stop(&self) {
        self.worker.stop().await;
        self.scheduler.stop();
        log_info!("Application services stopped");
    }
}
