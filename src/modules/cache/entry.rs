use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};

/// Priority class for cache entries; higher classes survive eviction longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CachePriority {
    Low,
    Normal,
    High,
}

impl CachePriority {
    pub fn rank(&self) -> i64 {
        match self {
            CachePriority::Low => 0,
            CachePriority::Normal => 1,
            CachePriority::High => 2,
        }
    }

    pub fn from_rank(rank: i64) -> Self {
        match rank {
            r if r <= 0 => CachePriority::Low,
            1 => CachePriority::Normal,
            _ => CachePriority::High,
        }
    }
}

/// Write options for `SmartCache::set`.
#[derive(Debug, Clone)]
pub struct CacheWriteOptions {
    pub ttl: Duration,
    pub persist: bool,
    pub priority: CachePriority,
}

impl Default for CacheWriteOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            persist: false,
            priority: CachePriority::Normal,
        }
    }
}

/// Memory-tier entry. Validity is computed at read time: an entry is valid
/// iff its age is strictly below the TTL, so a zero TTL is never valid.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: JsonValue,
    pub created_at: Instant,
    pub ttl: Duration,
    pub priority: CachePriority,
    pub access_count: u64,
    pub last_access: Instant,
}

impl CacheEntry {
    pub fn new(payload: JsonValue, ttl: Duration, priority: CachePriority) -> Self {
        let now = Instant::now();
        Self {
            payload,
            created_at: now,
            ttl,
            priority,
            access_count: 0,
            last_access: now,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_for(self.ttl)
    }

    pub fn is_valid_for(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }

    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_access = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_is_immediately_invalid() {
        let entry = CacheEntry::new(
            serde_json::json!(1),
            Duration::from_secs(0),
            CachePriority::Normal,
        );
        assert!(!entry.is_valid());
    }

    #[test]
    fn entry_valid_within_ttl() {
        let entry = CacheEntry::new(
            serde_json::json!("x"),
            Duration::from_secs(60),
            CachePriority::Normal,
        );
        assert!(entry.is_valid());
        // A shorter read-time TTL can override the stored one
        assert!(!entry.is_valid_for(Duration::from_secs(0)));
    }

    #[test]
    fn touch_bumps_access_count() {
        let mut entry = CacheEntry::new(
            serde_json::json!(null),
            Duration::from_secs(60),
            CachePriority::Low,
        );
        entry.touch();
        entry.touch();
        assert_eq!(entry.access_count, 2);
    }
}
