//! Cache Module
//!
//! Single-tier in-memory caching with TTL expiration, tag indexing and
//! memory-pressure LRU eviction.

mod backend;
mod entry;
mod lru;
mod options;
mod outcome;
mod shared;
mod stats;
mod store;
mod value;


// Re-export public types
pub use backend::LayerBackend;
pub use entry::{current_timestamp_ms, CacheEntry, Hit};
pub use lru::LruTracker;
pub use options::SetOptions;
pub use outcome::GetOrSet;
pub use shared::SharedStore;
pub use stats::{CacheStats, MemoryUsage};
pub use store::{glob_matches, CacheStore, StoreConfig};
pub use value::{serialized_size, CacheValue, Numeric};
