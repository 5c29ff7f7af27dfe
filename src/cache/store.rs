//! Cache Store Module
//!
//! Single-tier cache engine combining HashMap storage with a tag index, LRU
//! tracking, TTL expiration and a soft memory ceiling.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::value::serialized_size;
use crate::cache::{
    CacheEntry, CacheStats, CacheValue, Hit, LruTracker, MemoryUsage, Numeric, SetOptions,
};
use crate::error::{CacheError, Result};

// == Store Config ==
/// Sizing and eviction parameters for one store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Soft memory ceiling in bytes
    pub max_memory_bytes: usize,
    /// Evict once usage exceeds this percentage of the ceiling
    pub eviction_threshold: u8,
    /// Percentage of entries removed per eviction round (rounded up)
    pub eviction_batch: u8,
    /// TTL applied to writes that carry none; `None` = never expire
    pub default_ttl: Option<Duration>,
}

impl StoreConfig {
    pub fn with_max_memory(max_memory_bytes: usize) -> Self {
        Self {
            max_memory_bytes,
            ..Self::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_memory_bytes: 64 * 1024 * 1024,
            eviction_threshold: 90,
            eviction_batch: 10,
            default_ttl: None,
        }
    }
}

// == Cache Store ==
/// Single-tier cache storage with tag indexing, LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Tag -> keys carrying it
    tag_index: HashMap<String, HashSet<String>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Hit/miss/eviction counters
    stats: CacheStats,
    /// Sum of entry sizes
    used_bytes: usize,
    config: StoreConfig,
}

impl<T: CacheValue> CacheStore<T> {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            entries: HashMap::new(),
            tag_index: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            used_bytes: 0,
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry for the key.
    ///
    /// Creation time, access time and access count start over. Runs the
    /// eviction check after the write, so the new entry counts toward usage.
    pub fn set(&mut self, key: &str, value: T, opts: &SetOptions) -> Result<()> {
        let size = serialized_size(key, &value)?;

        self.remove_entry(key);

        let ttl = opts.ttl.or(self.config.default_ttl);
        let entry = CacheEntry::new(key, value, ttl)
            .with_tags(opts.tags.iter().cloned())
            .with_metadata(opts.metadata.clone())
            .with_size(size);

        for tag in &entry.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
        self.used_bytes += size;
        self.lru.touch(key);
        self.entries.insert(key.to_string(), entry);

        self.evict_if_needed();
        Ok(())
    }

    // == Get ==
    /// Retrieves a live value, counting a hit or a miss.
    ///
    /// Expired entries are deleted here and reported as misses.
    pub fn get(&mut self, key: &str) -> Option<T> {
        self.read(key).map(|entry| entry.value.clone())
    }

    /// Like [`get`](Self::get), but also returns remaining TTL, tags and
    /// metadata.
    pub fn lookup(&mut self, key: &str) -> Option<Hit<T>> {
        self.read(key).map(Hit::from_entry)
    }

    fn read(&mut self, key: &str) -> Option<&CacheEntry<T>> {
        let now = current_timestamp_ms();
        let expired = self.entries.get(key).map(|entry| entry.is_expired_at(now));

        match expired {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(true) => {
                self.remove_entry(key);
                self.stats.record_miss();
                return None;
            }
            Some(false) => {}
        }

        self.stats.record_hit();
        self.lru.touch(key);
        let entry = self.entries.get_mut(key)?;
        entry.touch();
        Some(&*entry)
    }

    // == Has ==
    /// Expiry-aware existence check with no effect on counters or recency.
    pub fn has(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Returns the live entry for a key without touching it.
    pub fn entry(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    // == Delete ==
    /// Removes an entry. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key).is_some()
    }

    // == Clear ==
    /// Drops every entry and zeroes the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.tag_index.clear();
        self.lru.clear();
        self.used_bytes = 0;
        self.stats.reset();
    }

    // == Keys ==
    /// Live keys, sorted, optionally filtered by a `*` glob.
    pub fn keys(&self, pattern: Option<&str>) -> Vec<String> {
        let now = current_timestamp_ms();
        let mut keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .filter(|entry| pattern.map_or(true, |p| glob_matches(p, &entry.key)))
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys
    }

    // == Tags ==
    /// Every live entry carrying `tag`, sorted by key.
    pub fn get_by_tag(&self, tag: &str) -> Vec<(String, T)> {
        let Some(keys) = self.tag_index.get(tag) else {
            return Vec::new();
        };

        let now = current_timestamp_ms();
        let mut found: Vec<(String, T)> = keys
            .iter()
            .filter_map(|key| self.entries.get(key))
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| (entry.key.clone(), entry.value.clone()))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    /// Removes every entry carrying `tag`. Returns how many of them were live.
    pub fn delete_by_tag(&mut self, tag: &str) -> usize {
        let Some(keys) = self.tag_index.get(tag).cloned() else {
            return 0;
        };

        let now = current_timestamp_ms();
        keys.iter()
            .filter_map(|key| self.remove_entry(key))
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    // == Expiry ==
    /// Rewrites the expiry of a live entry to `ttl_secs` from now.
    pub fn expire(&mut self, key: &str, ttl_secs: u64) -> bool {
        self.update_ttl(key, Some(Duration::from_secs(ttl_secs)))
    }

    /// Removes the expiry of a live entry.
    pub fn persist(&mut self, key: &str) -> bool {
        self.update_ttl(key, None)
    }

    fn update_ttl(&mut self, key: &str, ttl: Option<Duration>) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.set_ttl(ttl);
                true
            }
            _ => false,
        }
    }

    /// Remaining whole seconds; `None` when the key is missing or never expires.
    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.entry(key).and_then(|entry| entry.ttl_remaining())
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let expired_keys: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }
        expired_keys.len()
    }

    // == Stats ==
    /// Returns a statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let now = current_timestamp_ms();
        let mut stats = self.stats.clone();
        stats.total_keys = self.entries.len();
        stats.total_size = self.used_bytes;
        stats.expired_keys = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count();
        stats.memory_usage = self.memory_usage();
        stats
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage::new(self.used_bytes, self.config.max_memory_bytes)
    }

    /// Number of entries held, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Eviction ==
    /// Evicts the least recently used entries while usage is over the
    /// threshold. Returns the number evicted.
    fn evict_if_needed(&mut self) -> usize {
        if !self.over_threshold() {
            return 0;
        }

        let len = self.entries.len();
        let batch = self.config.eviction_batch as usize;
        let count = (len * batch).div_ceil(100);
        let victims = self.lru.oldest(count);
        for key in &victims {
            self.remove_entry(key);
        }
        self.stats.record_evictions(victims.len());

        debug!(
            evicted = victims.len(),
            remaining = self.entries.len(),
            used_bytes = self.used_bytes,
            "Memory threshold exceeded, evicted least recently used entries"
        );
        victims.len()
    }

    fn over_threshold(&self) -> bool {
        let used = self.used_bytes as u128 * 100;
        let limit = self.config.eviction_threshold as u128 * self.config.max_memory_bytes as u128;
        used > limit
    }

    /// Removes an entry and all of its bookkeeping.
    fn remove_entry(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.used_bytes = self.used_bytes.saturating_sub(entry.size_bytes);
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }
}

impl<T: CacheValue + Numeric> CacheStore<T> {
    // == Counters ==
    /// Adds `delta` to a numeric value, treating a missing key as 0.
    ///
    /// Expiry, tags and metadata of an existing entry are kept.
    pub fn increment(&mut self, key: &str, delta: i64) -> Result<i64> {
        let current = match self.entry(key) {
            Some(entry) => Some(
                entry
                    .value
                    .as_count()
                    .ok_or_else(|| CacheError::NotANumber(key.to_string()))?,
            ),
            None => None,
        };

        let Some(current) = current else {
            self.set(key, T::from_count(delta), &SetOptions::default())?;
            return Ok(delta);
        };

        let next = current
            .checked_add(delta)
            .ok_or_else(|| CacheError::InvalidRequest(format!("Counter '{}' overflowed", key)))?;
        let value = T::from_count(next);
        let size = serialized_size(key, &value)?;

        if let Some(entry) = self.entries.get_mut(key) {
            self.used_bytes = self.used_bytes.saturating_sub(entry.size_bytes) + size;
            entry.value = value;
            entry.size_bytes = size;
        }
        self.lru.touch(key);
        self.evict_if_needed();
        Ok(next)
    }

    pub fn decrement(&mut self, key: &str, delta: i64) -> Result<i64> {
        let negated = delta
            .checked_neg()
            .ok_or_else(|| CacheError::InvalidRequest(format!("Cannot negate {}", delta)))?;
        self.increment(key, negated)
    }
}

impl<T: CacheValue> Default for CacheStore<T> {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

// == Glob Matching ==
/// Matches `text` against a pattern where `*` stands for any run of
/// characters. Every other character matches itself.
pub fn glob_matches(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some(pi);
            pi += 1;
            mark = ti;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}
