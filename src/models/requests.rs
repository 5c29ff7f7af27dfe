//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::SetOptions;

/// Longest key accepted over HTTP, in bytes. The cache itself has no limit.
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in seconds; the matching pattern's TTL applies otherwise
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Layer name that overrides pattern routing
    #[serde(default)]
    pub partition: Option<String>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        if self.tags.iter().any(|tag| tag.is_empty()) {
            return Some("Tags cannot be empty".to_string());
        }
        None
    }

    pub fn options(&self) -> SetOptions {
        let mut opts = SetOptions::new().with_tags(self.tags.iter().cloned());
        if let Some(ttl) = self.ttl {
            opts = opts.with_ttl_secs(ttl);
        }
        if let Some(partition) = &self.partition {
            opts = opts.in_partition(partition.clone());
        }
        opts
    }
}

/// `?layer=` query used by GET /get/:key and POST /clear
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerQuery {
    pub layer: Option<String>,
}
