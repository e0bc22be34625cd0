use chrono::{Duration as ChronoDuration, Utc};
use showvault::modules::cache::{
    CacheConfig, CachePriority, CacheWriteOptions, CompositePolicy, PersistentTier, SmartCache,
    SqlitePersistentTier,
};
use showvault::shared::infrastructure::database::Database;
use std::sync::Arc;
use std::time::Duration;

async fn cache_over_sqlite() -> (SmartCache, Database) {
    let db = Database::in_memory().await.expect("in-memory database");
    let cache = SmartCache::new(
        CacheConfig::default(),
        Arc::new(SqlitePersistentTier::new(db.pool().clone())),
        Box::new(CompositePolicy::default()),
    );
    (cache, db)
}

fn persisted(ttl: Duration) -> CacheWriteOptions {
    CacheWriteOptions {
        ttl,
        persist: true,
        priority: CachePriority::Normal,
    }
}

#[tokio::test]
async fn persisted_entries_survive_a_memory_wipe() {
    let (cache, _db) = cache_over_sqlite().await;

    cache
        .set("episodes:tt1:1", &vec!["Pilot", "Cat's in the Bag..."], persisted(Duration::from_secs(3600)))
        .await
        .unwrap();
    cache.clear_memory();

    // Served from the persistent tier and promoted back into memory
    let got: Option<Vec<String>> = cache.get("episodes:tt1:1").await.unwrap();
    assert_eq!(
        got,
        Some(vec!["Pilot".to_string(), "Cat's in the Bag...".to_string()])
    );
    assert_eq!(cache.stats().entries_count, 1);
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn expired_persistent_rows_are_dropped_on_read() {
    let (cache, db) = cache_over_sqlite().await;
    let tier = SqlitePersistentTier::new(db.pool().clone());

    cache
        .set("dead", &1, persisted(Duration::from_secs(60)))
        .await
        .unwrap();
    cache.clear_memory();

    // Age the row past its TTL
    sqlx::query("UPDATE cache_entries SET created_at = ? WHERE cache_key = ?")
        .bind(Utc::now() - ChronoDuration::hours(1))
        .bind("dead")
        .execute(db.pool())
        .await
        .unwrap();

    let got: Option<i32> = cache.get("dead").await.unwrap();
    assert_eq!(got, None);
    assert_eq!(tier.len().await.unwrap(), 0);
}

#[tokio::test]
async fn promotion_carries_only_the_remaining_ttl() {
    let (cache, db) = cache_over_sqlite().await;

    cache
        .set("k", &"v", persisted(Duration::from_secs(100)))
        .await
        .unwrap();
    cache.clear_memory();

    // Make 90 of the 100 seconds already spent
    sqlx::query("UPDATE cache_entries SET created_at = ? WHERE cache_key = ?")
        .bind(Utc::now() - ChronoDuration::seconds(90))
        .bind("k")
        .execute(db.pool())
        .await
        .unwrap();

    // A strict read-time bound rejects the aged row without deleting it,
    // because it is still valid by its own TTL
    let strict: Option<String> = cache
        .get_with_ttl("k", Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(strict, None);

    let got: Option<String> = cache.get("k").await.unwrap();
    assert_eq!(got, Some("v".to_string()));
}

#[tokio::test]
async fn sweep_purges_expired_rows_from_the_persistent_tier() {
    let (cache, db) = cache_over_sqlite().await;

    cache
        .set("dead", &1, persisted(Duration::from_secs(60)))
        .await
        .unwrap();
    cache
        .set("alive", &2, persisted(Duration::from_secs(3600)))
        .await
        .unwrap();
    cache.clear_memory();

    sqlx::query("UPDATE cache_entries SET created_at = ? WHERE cache_key = ?")
        .bind(Utc::now() - ChronoDuration::hours(1))
        .bind("dead")
        .execute(db.pool())
        .await
        .unwrap();

    let swept = cache.sweep_expired().await.unwrap();
    assert_eq!(swept, 1);

    let tier = SqlitePersistentTier::new(db.pool().clone());
    assert_eq!(tier.len().await.unwrap(), 1);
}

#[tokio::test]
async fn budget_eviction_drops_low_priority_oldest_rows_first() {
    let db = Database::in_memory().await.expect("in-memory database");
    let tier = SqlitePersistentTier::new(db.pool().clone());
    let cache = SmartCache::new(
        CacheConfig::default(),
        Arc::new(SqlitePersistentTier::new(db.pool().clone())),
        Box::new(CompositePolicy::default()),
    );

    for i in 0..6 {
        let priority = if i < 3 {
            CachePriority::Low
        } else {
            CachePriority::High
        };
        cache
            .set(
                &format!("k{}", i),
                &i,
                CacheWriteOptions {
                    ttl: Duration::from_secs(3600),
                    persist: true,
                    priority,
                },
            )
            .await
            .unwrap();
    }

    // Budget of 4 with 25% freed leaves 3 rows; the low-priority ones go
    let removed = tier.evict_to_budget(4, 0.25).await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(tier.len().await.unwrap(), 3);

    for i in 3..6 {
        let kept = tier.load(&format!("k{}", i)).await.unwrap();
        assert!(kept.is_some(), "high-priority row k{} was evicted", i);
    }
}
