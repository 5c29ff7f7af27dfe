//! Shared Store Module
//!
//! Cloneable async handle over a [`CacheStore`] guarded by a tokio `RwLock`,
//! with an optional background sweep.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, CacheStore, CacheValue, GetOrSet, Hit, LayerBackend, Numeric, SetOptions,
    StoreConfig,
};
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweep_task, SweepGuard};

// == Shared Store ==
/// Thread-safe handle to one store. Clones share the same entries.
#[derive(Debug)]
pub struct SharedStore<T> {
    inner: Arc<RwLock<CacheStore<T>>>,
    sweeper: Arc<Mutex<Option<SweepGuard>>>,
}

impl<T> Clone for SharedStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<T: CacheValue> SharedStore<T> {
    // == Constructors ==
    /// Creates a store without a background sweep.
    pub fn new(config: StoreConfig) -> Self {
        Self::from_store(CacheStore::new(config))
    }

    pub fn from_store(store: CacheStore<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a store and starts its expiry sweep.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_sweeper(config: StoreConfig, interval: Duration) -> Self {
        let inner = Arc::new(RwLock::new(CacheStore::new(config)));
        let guard = SweepGuard::new(spawn_sweep_task(Arc::clone(&inner), interval));
        Self {
            inner,
            sweeper: Arc::new(Mutex::new(Some(guard))),
        }
    }

    /// Starts (or restarts) the background sweep.
    pub async fn start_sweeper(&self, interval: Duration) {
        let guard = SweepGuard::new(spawn_sweep_task(Arc::clone(&self.inner), interval));
        // replacing an old guard aborts its task
        *self.sweeper.lock().await = Some(guard);
    }

    pub async fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .await
            .as_ref()
            .is_some_and(|guard| !guard.is_finished())
    }

    // == Operations ==
    pub async fn set(&self, key: &str, value: T, opts: &SetOptions) -> Result<()> {
        self.inner.write().await.set(key, value, opts)
    }

    // Reads take the write lock: they update recency and counters.
    pub async fn get(&self, key: &str) -> Option<T> {
        self.inner.write().await.get(key)
    }

    pub async fn lookup(&self, key: &str) -> Option<Hit<T>> {
        self.inner.write().await.lookup(key)
    }

    pub async fn has(&self, key: &str) -> bool {
        self.inner.read().await.has(key)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.inner.write().await.delete(key)
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn keys(&self, pattern: Option<&str>) -> Vec<String> {
        self.inner.read().await.keys(pattern)
    }

    pub async fn get_by_tag(&self, tag: &str) -> Vec<(String, T)> {
        self.inner.read().await.get_by_tag(tag)
    }

    pub async fn delete_by_tag(&self, tag: &str) -> usize {
        self.inner.write().await.delete_by_tag(tag)
    }

    pub async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
        self.inner.write().await.expire(key, ttl_secs)
    }

    pub async fn persist(&self, key: &str) -> bool {
        self.inner.write().await.persist(key)
    }

    pub async fn ttl(&self, key: &str) -> Option<u64> {
        self.inner.read().await.ttl(key)
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats()
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.inner.write().await.cleanup_expired()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    // == Get Or Set ==
    /// Returns the cached value, or computes, stores and returns it.
    ///
    /// Only a failing factory is an error. If storing the computed value
    /// fails, the value is still returned with the write error attached.
    ///
    /// The lock is released while `factory` runs, so two callers missing the
    /// same key concurrently each run their own factory and the last write
    /// wins. There is no single-flight deduplication.
    pub async fn get_or_set<F, Fut>(
        &self,
        key: &str,
        factory: F,
        opts: &SetOptions,
    ) -> Result<GetOrSet<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(GetOrSet::stored(value));
        }

        debug!(key, "Cache miss, invoking factory");
        let value = factory()
            .await
            .map_err(|err| CacheError::Factory(format!("{:#}", err)))?;
        match self.set(key, value.clone(), opts).await {
            Ok(()) => Ok(GetOrSet::stored(value)),
            Err(err) => {
                warn!(key, error = %err, "Computed value could not be cached");
                Ok(GetOrSet::unstored(value, err))
            }
        }
    }

    // == Shutdown ==
    /// Cancels the sweep and drops every entry.
    pub async fn shutdown(&self) {
        self.sweeper.lock().await.take();
        self.inner.write().await.clear();
        info!("Store shut down");
    }
}

impl<T: CacheValue + Numeric> SharedStore<T> {
    pub async fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.inner.write().await.increment(key, delta)
    }

    pub async fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.inner.write().await.decrement(key, delta)
    }
}

#[async_trait]
impl<T: CacheValue> LayerBackend<T> for SharedStore<T> {
    async fn get(&self, key: &str) -> Result<Option<Hit<T>>> {
        Ok(self.lookup(key).await)
    }

    async fn has(&self, key: &str) -> Result<bool> {
        Ok(SharedStore::has(self, key).await)
    }

    async fn set(&self, key: &str, value: T, opts: &SetOptions) -> Result<()> {
        SharedStore::set(self, key, value, opts).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(SharedStore::delete(self, key).await)
    }

    async fn delete_by_tag(&self, tag: &str) -> Result<usize> {
        Ok(SharedStore::delete_by_tag(self, tag).await)
    }

    async fn keys(&self, pattern: Option<&str>) -> Result<Vec<String>> {
        Ok(SharedStore::keys(self, pattern).await)
    }

    async fn clear(&self) -> Result<()> {
        SharedStore::clear(self).await;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        Ok(SharedStore::stats(self).await)
    }

    async fn shutdown(&self) -> Result<()> {
        SharedStore::shutdown(self).await;
        Ok(())
    }
}
