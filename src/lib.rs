//! Layered Cache - multi-layer in-memory caching with pattern routing
//!
//! Single-tier stores with TTL expiration, tag invalidation and LRU eviction,
//! composed by an orchestrator that routes keys to layers and promotes hits.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod layered;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStore, SetOptions, SharedStore, StoreConfig};
pub use config::Config;
pub use error::{CacheError, Result};
pub use layered::{GetOptions, Orchestrator};
