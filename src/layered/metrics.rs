//! Orchestrator metrics
//!
//! Cumulative per-layer, per-pattern and global counters. Snapshots are
//! plain values, never live references.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Serialize;

use crate::cache::CacheStats;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerMetrics {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    /// Entries currently held by the layer's store
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternMetrics {
    pub requests: u64,
    pub hits: u64,
    pub avg_response_time_ms: f64,
}

impl PatternMetrics {
    fn record(&mut self, hit: bool, elapsed: Duration) {
        self.requests += 1;
        if hit {
            self.hits += 1;
        }
        let n = self.requests as f64;
        let latest = elapsed.as_secs_f64() * 1000.0;
        self.avg_response_time_ms = (self.avg_response_time_ms * (n - 1.0) + latest) / n;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalMetrics {
    pub total_requests: u64,
    pub total_hits: u64,
    pub overall_hit_rate: f64,
}

/// Snapshot returned by `Orchestrator::get_metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub layers: BTreeMap<String, LayerMetrics>,
    pub patterns: BTreeMap<String, PatternMetrics>,
    pub global: GlobalMetrics,
}

// == Recorder ==
#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    layers: HashMap<String, LayerMetrics>,
    patterns: HashMap<String, PatternMetrics>,
    global: GlobalMetrics,
}

impl MetricsRecorder {
    pub fn record_layer_hit(&mut self, layer: &str) {
        self.layers.entry(layer.to_string()).or_default().hits += 1;
    }

    pub fn record_layer_miss(&mut self, layer: &str) {
        self.layers.entry(layer.to_string()).or_default().misses += 1;
    }

    /// One orchestrator-level `get`.
    pub fn record_request(&mut self, pattern: Option<&str>, hit: bool, elapsed: Duration) {
        self.global.total_requests += 1;
        if hit {
            self.global.total_hits += 1;
        }
        if let Some(name) = pattern {
            self.patterns
                .entry(name.to_string())
                .or_default()
                .record(hit, elapsed);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Builds a snapshot, recomputing rates. Every layer in `sizes` appears
    /// in the snapshot even if it has seen no traffic.
    pub fn snapshot(&self, sizes: &[(String, usize)]) -> CacheMetrics {
        let mut layers = BTreeMap::new();
        for (name, size) in sizes {
            let mut metrics = self.layers.get(name).cloned().unwrap_or_default();
            metrics.hit_rate = CacheStats::compute_hit_rate(metrics.hits, metrics.misses);
            metrics.size = *size;
            layers.insert(name.clone(), metrics);
        }

        let mut global = self.global.clone();
        global.overall_hit_rate = if global.total_requests == 0 {
            0.0
        } else {
            global.total_hits as f64 / global.total_requests as f64
        };

        CacheMetrics {
            layers,
            patterns: self
                .patterns
                .iter()
                .map(|(name, metrics)| (name.clone(), metrics.clone()))
                .collect(),
            global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_average() {
        let mut metrics = PatternMetrics::default();
        metrics.record(true, Duration::from_millis(10));
        metrics.record(false, Duration::from_millis(20));
        metrics.record(true, Duration::from_millis(30));

        assert_eq!(metrics.requests, 3);
        assert_eq!(metrics.hits, 2);
        assert!((metrics.avg_response_time_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_rates() {
        let mut recorder = MetricsRecorder::default();
        recorder.record_layer_miss("L1");
        recorder.record_layer_hit("L2");
        recorder.record_layer_hit("L1");
        recorder.record_layer_hit("L1");
        recorder.record_request(Some("route"), true, Duration::from_millis(1));
        recorder.record_request(None, false, Duration::from_millis(1));

        let snapshot = recorder.snapshot(&[
            ("L1".to_string(), 4),
            ("L2".to_string(), 1),
            ("L3".to_string(), 0),
        ]);

        let l1 = &snapshot.layers["L1"];
        assert_eq!((l1.hits, l1.misses, l1.size), (2, 1, 4));
        assert!((l1.hit_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snapshot.layers["L3"], LayerMetrics::default());
        assert_eq!(snapshot.global.total_requests, 2);
        assert_eq!(snapshot.global.overall_hit_rate, 0.5);
        assert_eq!(snapshot.patterns["route"].requests, 1);
        assert!(!snapshot.patterns.contains_key("user"));
    }

    #[test]
    fn test_reset() {
        let mut recorder = MetricsRecorder::default();
        recorder.record_layer_hit("L1");
        recorder.record_request(Some("user"), true, Duration::ZERO);
        recorder.reset();

        let snapshot = recorder.snapshot(&[("L1".to_string(), 0)]);
        assert_eq!(snapshot.layers["L1"].hits, 0);
        assert!(snapshot.patterns.is_empty());
        assert_eq!(snapshot.global, GlobalMetrics::default());
    }
}
