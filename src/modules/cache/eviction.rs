//! Pluggable eviction scoring for the memory tier.
//!
//! One cache, one injected policy: either plain LRU or the composite
//! priority/frequency/recency score. Entries with the lowest score are
//! evicted first.

use crate::modules::cache::entry::CachePriority;
use std::time::Duration;

/// Snapshot of an entry considered for eviction.
#[derive(Debug, Clone)]
pub struct EvictionCandidate {
    pub key: String,
    pub priority: CachePriority,
    pub access_count: u64,
    pub idle: Duration,
}

pub trait EvictionPolicy: Send + Sync {
    /// Higher score = keep longer.
    fn score(&self, candidate: &EvictionCandidate) -> f64;
}

/// Pure recency: least-recently-used entries go first.
#[derive(Debug, Default)]
pub struct LruPolicy;

impl EvictionPolicy for LruPolicy {
    fn score(&self, candidate: &EvictionCandidate) -> f64 {
        -candidate.idle.as_secs_f64()
    }
}

/// Composite score over priority class, access frequency and recency, so a
/// high-priority hot entry outlives a low-priority one-off even when older.
#[derive(Debug, Clone)]
pub struct CompositePolicy {
    pub priority_weight: f64,
    pub frequency_weight: f64,
    pub recency_weight: f64,
    /// Frequency contribution saturates here so one hot key cannot become
    /// unevictable forever.
    pub frequency_cap: u64,
}

impl Default for CompositePolicy {
    fn default() -> Self {
        Self {
            priority_weight: 1000.0,
            frequency_weight: 10.0,
            recency_weight: 1.0,
            frequency_cap: 50,
        }
    }
}

impl EvictionPolicy for CompositePolicy {
    fn score(&self, candidate: &EvictionCandidate) -> f64 {
        let priority = candidate.priority.rank() as f64 * self.priority_weight;
        let frequency =
            candidate.access_count.min(self.frequency_cap) as f64 * self.frequency_weight;
        let recency_penalty = candidate.idle.as_secs_f64() * self.recency_weight;
        priority + frequency - recency_penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        priority: CachePriority,
        access_count: u64,
        idle_secs: u64,
    ) -> EvictionCandidate {
        EvictionCandidate {
            key: "k".to_string(),
            priority,
            access_count,
            idle: Duration::from_secs(idle_secs),
        }
    }

    #[test]
    fn lru_orders_by_idle_time_only() {
        let policy = LruPolicy;
        let fresh = candidate(CachePriority::Low, 0, 1);
        let stale = candidate(CachePriority::High, 100, 500);
        assert!(policy.score(&fresh) > policy.score(&stale));
    }

    #[test]
    fn composite_keeps_high_priority_over_idle_low_priority() {
        let policy = CompositePolicy::default();
        let high = candidate(CachePriority::High, 0, 120);
        let low = candidate(CachePriority::Low, 0, 10);
        assert!(policy.score(&high) > policy.score(&low));
    }

    #[test]
    fn composite_frequency_saturates() {
        let policy = CompositePolicy::default();
        let hot = candidate(CachePriority::Normal, 50, 0);
        let hotter = candidate(CachePriority::Normal, 5000, 0);
        assert_eq!(policy.score(&hot), policy.score(&hotter));
    }
}
