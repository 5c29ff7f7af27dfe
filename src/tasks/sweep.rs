//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from a store,
//! bounding how long an expired entry that nobody reads occupies memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheStore, CacheValue};

/// Default period between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task sleeps for `interval` between runs and takes the store's write
/// lock only for the sweep itself. It runs until aborted; wrap the handle in
/// a [`SweepGuard`] to tie its lifetime to a scope.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(CacheStore::<String>::default()));
/// let guard = SweepGuard::new(spawn_sweep_task(cache.clone(), DEFAULT_SWEEP_INTERVAL));
/// // dropping the guard stops the sweep
/// ```
pub fn spawn_sweep_task<T: CacheValue>(
    cache: Arc<RwLock<CacheStore<T>>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.cleanup_expired();
                (removed, cache_guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "Expiry sweep removed expired entries");
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

// == Sweep Guard ==
/// Owns a sweep task and aborts it when dropped.
#[derive(Debug)]
pub struct SweepGuard {
    handle: JoinHandle<()>,
}

impl SweepGuard {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
