//! Multi-tier cache: fast in-memory tier over a slower persistent tier.
//!
//! Reads check memory first and promote persistent hits (with their remaining
//! TTL) back into memory. Expiry is computed at read time; a periodic sweep
//! purges expired entries from both tiers and keeps the persistent tier
//! inside its entry budget.

use crate::modules::cache::entry::{CacheEntry, CacheWriteOptions};
use crate::modules::cache::eviction::{EvictionCandidate, EvictionPolicy};
use crate::modules::cache::persistent::{PersistedEntry, PersistentTier};
use crate::shared::errors::AppResult;
use chrono::Utc;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Memory-tier capacity before eviction kicks in.
    pub max_entries: usize,
    /// TTL used when a write does not specify one.
    pub default_ttl: Duration,
    /// Interval of the background expired-entry sweep.
    pub sweep_interval: Duration,
    /// Persistent-tier entry budget.
    pub persistent_budget: usize,
    /// Fraction of the budget freed when the persistent tier overflows.
    pub persistent_free_fraction: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(300),
            persistent_budget: 10_000,
            persistent_free_fraction: 0.2,
        }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries_count: usize,
    pub expired_cleanups: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

pub struct SmartCache {
    memory: Arc<DashMap<String, CacheEntry>>,
    persistent: Arc<dyn PersistentTier>,
    policy: Box<dyn EvictionPolicy>,
    config: CacheConfig,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    evictions: Arc<AtomicU64>,
    cleanups: Arc<AtomicU64>,
    sweeper_started: Arc<AtomicBool>,
}

impl SmartCache {
    pub fn new(
        config: CacheConfig,
        persistent: Arc<dyn PersistentTier>,
        policy: Box<dyn EvictionPolicy>,
    ) -> Self {
        let cache = Self {
            memory: Arc::new(DashMap::new()),
            persistent,
            policy,
            config,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            evictions: Arc::new(AtomicU64::new(0)),
            cleanups: Arc::new(AtomicU64::new(0)),
            sweeper_started: Arc::new(AtomicBool::new(false)),
        };

        // Start the sweep task right away when a runtime is available;
        // otherwise the first cache operation starts it.
        if tokio::runtime::Handle::try_current().is_ok() {
            cache.ensure_sweeper_started();
        }

        cache
    }

    /// Read using the TTL each entry was written with.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        self.get_inner(key, None).await
    }

    /// Read with a caller-supplied freshness bound overriding the stored TTL.
    pub async fn get_with_ttl<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
    ) -> AppResult<Option<T>> {
        self.get_inner(key, Some(ttl)).await
    }

    async fn get_inner<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl_override: Option<Duration>,
    ) -> AppResult<Option<T>> {
        self.ensure_sweeper_started();

        let mut stale_in_memory = false;
        if let Some(mut entry) = self.memory.get_mut(key) {
            let ttl = ttl_override.unwrap_or(entry.ttl);
            if entry.is_valid_for(ttl) {
                entry.touch();
                self.hits.fetch_add(1, Ordering::Relaxed);
                let payload = entry.payload.clone();
                drop(entry);
                log::debug!("Cache hit (memory) for key: {}", key);
                return Ok(Some(serde_json::from_value(payload)?));
            }
            stale_in_memory = true;
        }
        if stale_in_memory {
            self.memory.remove(key);
        }

        if let Some(persisted) = self.persistent.load(key).await? {
            let now = Utc::now();
            let effective_ttl = ttl_override.unwrap_or(persisted.ttl);
            let age = now
                .signed_duration_since(persisted.created_at)
                .to_std()
                .unwrap_or(Duration::ZERO);

            if age < effective_ttl {
                // Promote into the memory tier with whatever TTL is left
                let remaining = effective_ttl - age;
                let payload = persisted.payload.clone();
                self.memory.insert(
                    key.to_string(),
                    CacheEntry::new(persisted.payload, remaining, persisted.priority),
                );
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Cache hit (persistent, promoted) for key: {}", key);
                return Ok(Some(serde_json::from_value(payload)?));
            }

            // Only drop the row when it is dead by its own TTL, not by a
            // stricter read-time override.
            if !persisted.is_valid_at(now) {
                self.persistent.remove(key).await?;
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("Cache miss for key: {}", key);
        Ok(None)
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        options: CacheWriteOptions,
    ) -> AppResult<()> {
        self.ensure_sweeper_started();

        let payload = serde_json::to_value(value)?;

        if self.memory.len() >= self.config.max_entries {
            self.evict_under_pressure();
        }

        self.memory.insert(
            key.to_string(),
            CacheEntry::new(payload.clone(), options.ttl, options.priority),
        );

        if options.persist {
            let now = Utc::now();
            self.persistent
                .store(&PersistedEntry {
                    key: key.to_string(),
                    payload,
                    created_at: now,
                    ttl: options.ttl,
                    priority: options.priority,
                    access_count: 0,
                    last_access_at: now,
                })
                .await?;
        }

        log::debug!(
            "Cached key: {} (ttl: {:?}, persist: {})",
            key,
            options.ttl,
            options.persist
        );
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> AppResult<()> {
        self.memory.remove(key);
        self.persistent.remove(key).await
    }

    /// Purge expired entries from both tiers and enforce the persistent
    /// budget. Returns how many entries were dropped as expired.
    pub async fn sweep_expired(&self) -> AppResult<u64> {
        let swept = sweep_tiers(&self.memory, &self.persistent, &self.config).await?;
        self.cleanups.fetch_add(swept, Ordering::Relaxed);
        Ok(swept)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries_count: self.memory.len(),
            expired_cleanups: self.cleanups.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear_memory(&self) {
        self.memory.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Evict lowest-scoring entries down to 90% of capacity.
    fn evict_under_pressure(&self) {
        let current = self.memory.len();
        if current < self.config.max_entries {
            return;
        }

        let mut scored: Vec<(String, f64)> = self
            .memory
            .iter()
            .map(|entry| {
                let candidate = EvictionCandidate {
                    key: entry.key().clone(),
                    priority: entry.priority,
                    access_count: entry.access_count,
                    idle: entry.last_access.elapsed(),
                };
                let score = self.policy.score(&candidate);
                (candidate.key, score)
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let target = (self.config.max_entries * 9) / 10;
        let to_evict = current.saturating_sub(target).max(1);

        for (key, _) in scored.into_iter().take(to_evict) {
            self.memory.remove(&key);
        }
        self.evictions.fetch_add(to_evict as u64, Ordering::Relaxed);

        log::debug!(
            "Evicted {} cache entries under memory pressure (was {}, now {})",
            to_evict,
            current,
            self.memory.len()
        );
    }

    /// Idempotent start of the background sweep task.
    fn ensure_sweeper_started(&self) {
        if self
            .sweeper_started
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return; // Already started
        }

        let memory = self.memory.clone();
        let persistent = self.persistent.clone();
        let config = self.config.clone();
        let cleanups = self.cleanups.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.sweep_interval);
            interval.tick().await; // First tick fires immediately, skip it

            loop {
                interval.tick().await;
                match sweep_tiers(&memory, &persistent, &config).await {
                    Ok(swept) => {
                        if swept > 0 {
                            cleanups.fetch_add(swept, Ordering::Relaxed);
                            log::debug!("Swept {} expired cache entries", swept);
                        }
                    }
                    Err(e) => log::warn!("Cache sweep failed: {}", e),
                }
            }
        });
        log::debug!("Cache sweep task started");
    }
}

async fn sweep_tiers(
    memory: &DashMap<String, CacheEntry>,
    persistent: &Arc<dyn PersistentTier>,
    config: &CacheConfig,
) -> AppResult<u64> {
    let mut expired_keys = Vec::new();
    for entry in memory.iter() {
        if !entry.value().is_valid() {
            expired_keys.push(entry.key().clone());
        }
    }
    let memory_swept = expired_keys.len() as u64;
    for key in expired_keys {
        memory.remove(&key);
    }

    let persistent_swept = persistent.purge_expired().await?;

    if persistent.len().await? > config.persistent_budget as u64 {
        persistent
            .evict_to_budget(config.persistent_budget, config.persistent_free_fraction)
            .await?;
    }

    Ok(memory_swept + persistent_swept)
}
