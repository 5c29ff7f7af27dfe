//! Cache Statistics Module
//!
//! Tracks store performance metrics including hits, misses, evictions and
//! memory usage.

use serde::Serialize;

// == Memory Usage ==
/// Approximate memory consumption against the store's soft ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    /// Bytes currently accounted to entries
    pub used: usize,
    /// Bytes left before the ceiling
    pub available: usize,
    /// used / ceiling * 100
    pub percentage: f64,
}

impl MemoryUsage {
    pub fn new(used: usize, max: usize) -> Self {
        let percentage = if max == 0 {
            100.0
        } else {
            used as f64 / max as f64 * 100.0
        };
        Self {
            used,
            available: max.saturating_sub(used),
            percentage,
        }
    }
}

// == Cache Stats ==
/// Snapshot of a store's performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Entries currently held, expired-but-unswept included
    pub total_keys: usize,
    /// Approximate serialized size of all entries
    pub total_size: usize,
    /// Number of successful reads
    pub hit_count: u64,
    /// Number of reads for missing or expired keys
    pub miss_count: u64,
    pub hit_rate: f64,
    /// Entries past their expiry still waiting for the sweep
    pub expired_keys: usize,
    /// Number of entries evicted under memory pressure
    pub evictions: u64,
    pub memory_usage: MemoryUsage,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn compute_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hit_count += 1;
        self.refresh_hit_rate();
    }

    pub fn record_miss(&mut self) {
        self.miss_count += 1;
        self.refresh_hit_rate();
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    /// Zeroes the counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn refresh_hit_rate(&mut self) {
        self.hit_rate = Self::compute_hit_rate(self.hit_count, self.miss_count);
    }
}
