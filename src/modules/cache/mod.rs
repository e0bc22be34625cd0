/// Multi-tier cache with a configurable eviction policy.
pub mod entry;
pub mod eviction;
pub mod persistent;
pub mod smart_cache;

pub use entry::{CacheEntry, CachePriority, CacheWriteOptions};
pub use eviction::{CompositePolicy, EvictionPolicy, LruPolicy};
pub use persistent::{PersistedEntry, PersistentTier, SqlitePersistentTier};
pub use smart_cache::{CacheConfig, CacheStats, SmartCache};
