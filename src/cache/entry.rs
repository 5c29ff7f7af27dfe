//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL, access
//! tracking and tag support.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Key the entry is stored under
    pub key: String,
    /// The stored value
    pub value: T,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read (Unix milliseconds)
    pub last_accessed: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
    /// Number of successful reads since the entry was written
    pub access_count: u64,
    /// Labels used for bulk invalidation
    pub tags: HashSet<String>,
    /// Side-channel data, never interpreted by the store
    pub metadata: Option<Value>,
    /// Approximate serialized size in bytes
    pub size_bytes: usize,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `key` - The key the entry lives under
    /// * `value` - The value to store
    /// * `ttl` - Optional time-to-live
    pub fn new(key: impl Into<String>, value: T, ttl: Option<Duration>) -> Self {
        let now = current_timestamp_ms();

        Self {
            key: key.into(),
            value,
            created_at: now,
            last_accessed: now,
            expires_at: ttl.map(|ttl| deadline(now, ttl)),
            access_count: 0,
            tags: HashSet::new(),
            metadata: None,
            size_bytes: 0,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, metadata: Option<Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_size(mut self, size_bytes: usize) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration time,
    /// so an entry written with a TTL of `n` seconds is absent at any time
    /// `>= created_at + n` and present strictly before. Lazy deletion and the
    /// periodic sweep both go through this predicate.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self) {
        self.last_accessed = current_timestamp_ms();
        self.access_count += 1;
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            expires.saturating_sub(now)
        })
    }

    /// Returns remaining TTL in whole seconds, or None if no expiration is set.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| ms / 1000)
    }

    /// Rewrites the expiry relative to now. `None` removes it.
    pub fn set_ttl(&mut self, ttl: Option<Duration>) {
        self.expires_at = ttl.map(|ttl| deadline(current_timestamp_ms(), ttl));
    }
}

/// Absolute expiry for a TTL starting at `now`. TTLs past the end of the
/// clock saturate to "never reached".
fn deadline(now: u64, ttl: Duration) -> u64 {
    now.saturating_add(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
}

// == Hit ==
/// A successful lookup: the value plus what a promotion needs to copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<T> {
    pub value: T,
    /// Remaining time-to-live, `None` when the entry never expires
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
}

impl<T: Clone> Hit<T> {
    pub(crate) fn from_entry(entry: &CacheEntry<T>) -> Self {
        let mut tags: Vec<String> = entry.tags.iter().cloned().collect();
        tags.sort();
        Self {
            value: entry.value.clone(),
            ttl: entry.ttl_remaining_ms().map(Duration::from_millis),
            tags,
            metadata: entry.metadata.clone(),
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
