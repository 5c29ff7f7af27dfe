//! Layer Backend Contract
//!
//! The async contract every orchestrator layer implements. The in-memory
//! [`SharedStore`](crate::cache::SharedStore) is one implementation; a layer
//! backed by a remote service implements the same trait.

use async_trait::async_trait;

use crate::cache::{CacheStats, Hit, SetOptions};
use crate::error::Result;

/// Store operations the orchestrator relies on.
///
/// Errors are only meaningful for backends that can fail (e.g. network
/// layers). The orchestrator turns read-path errors into misses and
/// propagates write-path errors.
#[async_trait]
pub trait LayerBackend<T>: Send + Sync {
    /// Live entry for `key`, counting a hit or a miss in the backend.
    async fn get(&self, key: &str) -> Result<Option<Hit<T>>>;

    /// Expiry-aware existence check without side effects.
    async fn has(&self, key: &str) -> Result<bool>;

    async fn set(&self, key: &str, value: T, opts: &SetOptions) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every entry carrying `tag`, returning the number of live ones.
    async fn delete_by_tag(&self, tag: &str) -> Result<usize>;

    async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>>;

    async fn clear(&self) -> Result<()>;

    async fn stats(&self) -> Result<CacheStats>;

    /// Backend's own liveness probe.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    /// Releases background resources and drops all data.
    async fn shutdown(&self) -> Result<()> {
        self.clear().await
    }
}
