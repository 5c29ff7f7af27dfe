//! Layered Cache Orchestrator
//!
//! Routes keys to prioritized layers by pattern, promotes hits into faster
//! layers, fans invalidation out to every layer and aggregates metrics.
//!
//! Writes to several layers (fan-out, promotion) are independent of each
//! other: there is no cross-layer atomicity, and a promotion can interleave
//! with a concurrent `set`/`delete` of the same key. Slower layers, and the
//! data source behind a `get_or_set` factory, stay authoritative.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::{join_all, BoxFuture};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{CacheValue, GetOrSet, Hit, LayerBackend, SetOptions};
use crate::error::{CacheError, Result};
use crate::layered::metrics::MetricsRecorder;
use crate::layered::pattern::{default_patterns, first_match};
use crate::layered::{
    CacheLayer, CacheMetrics, CachePattern, HealthDetails, HealthReport, HealthStatus,
    LayerHealth, LayerInfo,
};

/// Read options.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Probe this layer first if it is enabled
    pub preferred_layer: Option<String>,
}

impl GetOptions {
    pub fn prefer(layer: impl Into<String>) -> Self {
        Self {
            preferred_layer: Some(layer.into()),
        }
    }
}

/// One entry for [`Orchestrator::warm_cache`].
pub struct WarmEntry<T> {
    pub key: String,
    pub factory: BoxFuture<'static, anyhow::Result<T>>,
    pub opts: SetOptions,
}

impl<T> WarmEntry<T> {
    pub fn new<F>(key: impl Into<String>, factory: F, opts: SetOptions) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            key: key.into(),
            factory: Box::pin(factory),
            opts,
        }
    }
}

// == Orchestrator ==
/// Multi-layer cache front end.
///
/// Built once at startup and shared by handle (`Arc<Orchestrator<T>>`).
/// Internal locks are never held across a call into a layer.
pub struct Orchestrator<T> {
    /// Registration order; sorted by priority on use
    layers: RwLock<Vec<CacheLayer<T>>>,
    patterns: RwLock<Vec<CachePattern>>,
    metrics: Mutex<MetricsRecorder>,
}

impl<T: CacheValue> Default for Orchestrator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: CacheValue> Orchestrator<T> {
    pub fn new() -> Self {
        Self::with_patterns(Vec::new())
    }

    pub fn with_patterns(patterns: Vec<CachePattern>) -> Self {
        Self {
            layers: RwLock::new(Vec::new()),
            patterns: RwLock::new(patterns),
            metrics: Mutex::new(MetricsRecorder::default()),
        }
    }

    /// Orchestrator preloaded with the `user:`/`location:`/`session:`/
    /// `route:`/`static:` routing table.
    pub fn with_default_patterns() -> Result<Self> {
        Ok(Self::with_patterns(default_patterns()?))
    }

    // == Layer Registry ==
    pub async fn add_layer(
        &self,
        name: impl Into<String>,
        store: Arc<dyn LayerBackend<T>>,
        priority: u32,
        enabled: bool,
    ) -> Result<()> {
        let name = name.into();
        let mut layers = self.layers.write().await;
        if layers.iter().any(|layer| layer.name == name) {
            return Err(CacheError::DuplicateLayer(name));
        }

        info!(layer = %name, priority, enabled, "Cache layer added");
        layers.push(CacheLayer {
            name,
            priority,
            enabled,
            store,
        });
        Ok(())
    }

    /// Forgets a layer. Its store and data are left untouched.
    pub async fn remove_layer(&self, name: &str) -> bool {
        let mut layers = self.layers.write().await;
        let before = layers.len();
        layers.retain(|layer| layer.name != name);
        let removed = layers.len() < before;
        if removed {
            info!(layer = name, "Cache layer removed");
        }
        removed
    }

    pub async fn enable_layer(&self, name: &str) -> Result<()> {
        self.set_enabled(name, true).await
    }

    pub async fn disable_layer(&self, name: &str) -> Result<()> {
        self.set_enabled(name, false).await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut layers = self.layers.write().await;
        let layer = layers
            .iter_mut()
            .find(|layer| layer.name == name)
            .ok_or_else(|| CacheError::LayerNotFound(name.to_string()))?;
        layer.enabled = enabled;
        info!(layer = name, enabled, "Cache layer toggled");
        Ok(())
    }

    /// Registered layers by ascending priority.
    pub async fn layers(&self) -> Vec<LayerInfo> {
        let mut layers: Vec<LayerInfo> = self
            .layers
            .read()
            .await
            .iter()
            .map(CacheLayer::info)
            .collect();
        layers.sort_by_key(|layer| layer.priority);
        layers
    }

    /// Appends a pattern; it is consulted after every earlier one.
    pub async fn add_pattern(&self, pattern: CachePattern) {
        debug!(pattern = %pattern.name, layer = %pattern.layer, "Cache pattern added");
        self.patterns.write().await.push(pattern);
    }

    pub async fn pattern_names(&self) -> Vec<String> {
        self.patterns
            .read()
            .await
            .iter()
            .map(|pattern| pattern.name.clone())
            .collect()
    }

    /// Enabled layers by ascending priority, ties in registration order.
    async fn enabled_layers(&self) -> Vec<CacheLayer<T>> {
        let mut enabled: Vec<CacheLayer<T>> = self
            .layers
            .read()
            .await
            .iter()
            .filter(|layer| layer.enabled)
            .cloned()
            .collect();
        enabled.sort_by_key(|layer| layer.priority);
        enabled
    }

    async fn all_layers(&self) -> Vec<CacheLayer<T>> {
        self.layers.read().await.clone()
    }

    async fn match_pattern(&self, key: &str) -> Option<CachePattern> {
        first_match(&self.patterns.read().await, key).cloned()
    }

    // == Set ==
    /// Writes a value to the layer(s) its partition or pattern selects.
    ///
    /// Writes are best-effort per layer; a failing layer does not roll back
    /// the others. The first failure is returned once every write finished.
    pub async fn set(&self, key: &str, value: T, opts: &SetOptions) -> Result<()> {
        let pattern = self.match_pattern(key).await;
        let enabled = self.enabled_layers().await;
        let targets = resolve_targets(&enabled, opts.partition.as_deref(), pattern.as_ref());
        if targets.is_empty() {
            return Err(CacheError::NoAvailableLayer(key.to_string()));
        }

        let merged = merge_options(opts, pattern.as_ref());
        let writes = targets.iter().map(|layer| {
            let value = value.clone();
            let merged = &merged;
            async move { (layer.name.as_str(), layer.store.set(key, value, merged).await) }
        });

        let mut first_error = None;
        for (layer, result) in join_all(writes).await {
            match result {
                Ok(()) => debug!(layer, key, "Cache write"),
                Err(err) => {
                    warn!(layer, key, error = %err, "Cache layer write failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // == Get ==
    /// Looks a key up layer by layer and promotes hits into faster layers.
    ///
    /// Never fails: a layer error counts as a miss for that layer.
    pub async fn get(&self, key: &str, opts: &GetOptions) -> Option<T> {
        let started = Instant::now();
        let pattern = self.match_pattern(key).await;
        let order = search_order(
            self.enabled_layers().await,
            opts.preferred_layer.as_deref(),
        );

        let mut found: Option<(usize, Hit<T>)> = None;
        for (idx, layer) in order.iter().enumerate() {
            match layer.store.get(key).await {
                Ok(Some(hit)) => {
                    found = Some((idx, hit));
                    break;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        layer = %layer.name,
                        key,
                        error = %err,
                        "Cache layer read failed, treating as miss"
                    );
                }
            }
        }

        {
            let mut metrics = self.metrics.lock().await;
            let missed = found.as_ref().map_or(order.len(), |(idx, _)| *idx);
            for layer in &order[..missed] {
                metrics.record_layer_miss(&layer.name);
            }
            if let Some((idx, _)) = &found {
                metrics.record_layer_hit(&order[*idx].name);
            }
        }

        let value = match found {
            Some((idx, hit)) => {
                self.promote(key, &hit, &order[idx], &order).await;
                Some(hit.value)
            }
            None => None,
        };

        self.metrics.lock().await.record_request(
            pattern.as_ref().map(|pattern| pattern.name.as_str()),
            value.is_some(),
            started.elapsed(),
        );
        value
    }

    /// Copies a hit into every searched layer faster than the one it was
    /// found in. The copy never outlives the source entry.
    async fn promote(
        &self,
        key: &str,
        hit: &Hit<T>,
        source: &CacheLayer<T>,
        order: &[CacheLayer<T>],
    ) {
        if hit.ttl.is_some_and(|ttl| ttl.is_zero()) {
            return;
        }

        let faster: Vec<&CacheLayer<T>> = order
            .iter()
            .filter(|layer| layer.priority < source.priority)
            .collect();
        if faster.is_empty() {
            return;
        }

        let opts = SetOptions {
            ttl: hit.ttl,
            tags: hit.tags.clone(),
            metadata: hit.metadata.clone(),
            partition: None,
        };
        let writes = faster.iter().map(|layer| {
            let value = hit.value.clone();
            let opts = &opts;
            async move { (layer.name.as_str(), layer.store.set(key, value, opts).await) }
        });

        for (layer, result) in join_all(writes).await {
            match result {
                Ok(()) => debug!(key, from = %source.name, to = layer, "Promoted cache entry"),
                Err(err) => warn!(key, to = layer, error = %err, "Cache promotion failed"),
            }
        }
    }

    // == Has ==
    /// True if any enabled layer holds a live entry. No metric side effects.
    pub async fn has(&self, key: &str) -> bool {
        for layer in self.enabled_layers().await {
            match layer.store.has(key).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(err) => {
                    warn!(layer = %layer.name, key, error = %err, "Cache layer probe failed")
                }
            }
        }
        false
    }

    // == Delete ==
    /// Deletes from every enabled layer. True if any layer removed something.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let layers = self.enabled_layers().await;
        let results = join_all(layers.iter().map(|layer| layer.store.delete(key))).await;

        let mut removed = false;
        let mut first_error = None;
        for (layer, result) in layers.iter().zip(results) {
            match result {
                Ok(hit) => removed |= hit,
                Err(err) => {
                    warn!(layer = %layer.name, key, error = %err, "Cache layer delete failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(removed),
        }
    }

    // == Clear ==
    /// Clears one named layer, or every layer plus all orchestrator metrics.
    pub async fn clear(&self, layer: Option<&str>) -> Result<()> {
        let layers = self.all_layers().await;

        if let Some(name) = layer {
            let target = layers
                .iter()
                .find(|layer| layer.name == name)
                .ok_or_else(|| CacheError::LayerNotFound(name.to_string()))?;
            target.store.clear().await?;
            info!(layer = name, "Cache layer cleared");
            return Ok(());
        }

        let results = join_all(layers.iter().map(|layer| layer.store.clear())).await;
        self.metrics.lock().await.reset();
        info!(layers = layers.len(), "All cache layers cleared");

        results.into_iter().collect::<Result<Vec<()>>>().map(|_| ())
    }

    // == Invalidation ==
    /// Removes every live entry tagged `tag` from every enabled layer.
    pub async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        let layers = self.enabled_layers().await;
        let counts = join_all(layers.iter().map(|layer| layer.store.delete_by_tag(tag))).await;
        let total = sum_counts(&layers, counts)?;
        info!(tag, removed = total, "Invalidated cache entries by tag");
        Ok(total)
    }

    /// Removes every key matching the named pattern's regex from every
    /// enabled layer.
    pub async fn invalidate_by_pattern(&self, pattern_name: &str) -> Result<usize> {
        let pattern = self
            .patterns
            .read()
            .await
            .iter()
            .find(|pattern| pattern.name == pattern_name)
            .cloned()
            .ok_or_else(|| CacheError::PatternNotFound(pattern_name.to_string()))?;

        let layers = self.enabled_layers().await;
        let pattern = &pattern;
        let counts = join_all(layers.iter().map(|layer| async move {
            let mut removed = 0;
            for key in layer.store.keys(None).await? {
                if pattern.matches(&key) && layer.store.delete(&key).await? {
                    removed += 1;
                }
            }
            Ok::<usize, CacheError>(removed)
        }))
        .await;

        let total = sum_counts(&layers, counts)?;
        info!(pattern = pattern_name, removed = total, "Invalidated cache entries by pattern");
        Ok(total)
    }

    // == Get Or Set ==
    /// Routed read-through: on a miss, computes the value and writes it
    /// where its partition or pattern dictates.
    ///
    /// A failing factory is returned as [`CacheError::Factory`]. A failing
    /// write is not: the caller still gets the value, with the write error in
    /// [`GetOrSet::cache_error`].
    ///
    /// Concurrent misses for the same key each run their factory.
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
        let read = GetOptions {
            preferred_layer: opts.partition.clone(),
        };
        if let Some(value) = self.get(key, &read).await {
            return Ok(GetOrSet::stored(value));
        }

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

    // == Warm Cache ==
    /// Runs every factory concurrently and writes each result through
    /// [`set`](Self::set). Failures are logged and skipped. Returns the
    /// number of entries written.
    pub async fn warm_cache(&self, entries: Vec<WarmEntry<T>>) -> usize {
        let total = entries.len();
        let tasks = entries.into_iter().map(|entry| async move {
            let WarmEntry { key, factory, opts } = entry;
            let value = match factory.await {
                Ok(value) => value,
                Err(err) => {
                    warn!(key = %key, error = %err, "Cache warm-up factory failed");
                    return false;
                }
            };
            match self.set(&key, value, &opts).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(key = %key, error = %err, "Cache warm-up write failed");
                    false
                }
            }
        });

        let warmed = join_all(tasks).await.into_iter().filter(|ok| *ok).count();
        info!(warmed, failed = total - warmed, "Cache warm-up complete");
        warmed
    }

    // == Metrics ==
    /// Snapshot of cumulative metrics with fresh layer sizes and rates.
    pub async fn get_metrics(&self) -> CacheMetrics {
        let layers = self.all_layers().await;
        let stats = join_all(layers.iter().map(|layer| layer.store.stats())).await;

        let sizes: Vec<(String, usize)> = layers
            .iter()
            .zip(stats)
            .map(|(layer, stats)| {
                let size = stats.map(|s| s.total_keys).unwrap_or_else(|err| {
                    warn!(layer = %layer.name, error = %err, "Cache layer stats unavailable");
                    0
                });
                (layer.name.clone(), size)
            })
            .collect();

        self.metrics.lock().await.snapshot(&sizes)
    }

    // == Health ==
    /// Healthy unless a layer's own probe fails.
    pub async fn health_check(&self) -> HealthReport {
        let layers = self.all_layers().await;
        let probes = join_all(layers.iter().map(|layer| layer.store.health_check())).await;

        let layer_health: Vec<LayerHealth> = layers
            .iter()
            .zip(probes)
            .map(|(layer, probe)| LayerHealth {
                name: layer.name.clone(),
                enabled: layer.enabled,
                healthy: probe.is_ok(),
                error: probe.err().map(|err| err.to_string()),
            })
            .collect();

        let status = if layer_health.iter().all(|layer| layer.healthy) {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            details: HealthDetails {
                layer_count: layers.len(),
                pattern_count: self.patterns.read().await.len(),
                metrics: self.get_metrics().await,
                layers: layer_health,
            },
        }
    }

    // == Shutdown ==
    /// Shuts every layer down and forgets layers, patterns and metrics.
    pub async fn shutdown(&self) {
        let layers = std::mem::take(&mut *self.layers.write().await);
        self.patterns.write().await.clear();
        self.metrics.lock().await.reset();

        for layer in &layers {
            if let Err(err) = layer.store.shutdown().await {
                warn!(layer = %layer.name, error = %err, "Cache layer shutdown failed");
            }
        }
        info!(layers = layers.len(), "Cache orchestrator shut down");
    }
}

/// Partition (if it names an enabled layer), else the matching pattern's
/// layer (if enabled), else the fastest enabled layer.
fn resolve_targets<T>(
    enabled: &[CacheLayer<T>],
    partition: Option<&str>,
    pattern: Option<&CachePattern>,
) -> Vec<CacheLayer<T>> {
    let by_name = |name: &str| enabled.iter().find(|layer| layer.name == name).cloned();

    if let Some(partition) = partition {
        if let Some(layer) = by_name(partition) {
            return vec![layer];
        }
        debug!(partition, "Partition is not an enabled layer, falling back to routing");
    }

    if let Some(layer) = pattern.and_then(|pattern| by_name(&pattern.layer)) {
        return vec![layer];
    }

    enabled.first().cloned().into_iter().collect()
}

/// Caller TTL wins; pattern tags are appended to caller tags.
fn merge_options(opts: &SetOptions, pattern: Option<&CachePattern>) -> SetOptions {
    let mut merged = opts.clone();
    merged.partition = None;

    if let Some(pattern) = pattern {
        merged.ttl = opts.ttl.or(pattern.default_ttl);
        for tag in &pattern.tags {
            if !merged.tags.contains(tag) {
                merged.tags.push(tag.clone());
            }
        }
    }
    merged
}

fn search_order<T>(mut enabled: Vec<CacheLayer<T>>, preferred: Option<&str>) -> Vec<CacheLayer<T>> {
    let preferred_idx =
        preferred.and_then(|name| enabled.iter().position(|layer| layer.name == name));
    if let Some(idx) = preferred_idx {
        let layer = enabled.remove(idx);
        enabled.insert(0, layer);
    }
    enabled
}

fn sum_counts<T>(layers: &[CacheLayer<T>], counts: Vec<Result<usize>>) -> Result<usize> {
    let mut total = 0;
    let mut first_error = None;
    for (layer, count) in layers.iter().zip(counts) {
        match count {
            Ok(count) => total += count,
            Err(err) => {
                warn!(layer = %layer.name, error = %err, "Cache layer invalidation failed");
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(total),
    }
}
