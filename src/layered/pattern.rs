//! Key routing patterns
//!
//! A pattern maps key shapes to a default TTL, tags and a target layer.
//! Patterns are evaluated in registration order and the first match wins.

use std::time::Duration;

use regex::Regex;

use crate::error::{CacheError, Result};

/// Fastest layer name used by the default table.
pub const L1: &str = "L1";
pub const L2: &str = "L2";
/// Slowest layer name used by the default table.
pub const L3: &str = "L3";

// == Cache Pattern ==
#[derive(Debug, Clone)]
pub struct CachePattern {
    pub name: String,
    /// Tested against the raw key
    pub key_pattern: Regex,
    /// Used only when the caller supplies no TTL
    pub default_ttl: Option<Duration>,
    /// Appended to the caller's tags
    pub tags: Vec<String>,
    /// Layer the key is written to by default
    pub layer: String,
}

impl CachePattern {
    /// Compiles a pattern. Fails with `InvalidPattern` on a bad regex.
    pub fn new<I, S>(
        name: impl Into<String>,
        key_pattern: &str,
        default_ttl: Option<Duration>,
        tags: I,
        layer: impl Into<String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let key_pattern = Regex::new(key_pattern)
            .map_err(|err| CacheError::InvalidPattern(format!("{}: {}", name, err)))?;

        Ok(Self {
            name,
            key_pattern,
            default_ttl,
            tags: tags.into_iter().map(Into::into).collect(),
            layer: layer.into(),
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.key_pattern.is_match(key)
    }
}

/// The key conventions the business services rely on.
pub fn default_patterns() -> Result<Vec<CachePattern>> {
    let table: [(&str, &str, u64, &str); 5] = [
        ("user", "^user:", 300, L1),
        ("location", "^location:", 60, L1),
        ("session", "^session:", 1800, L1),
        ("route", "^route:", 1800, L2),
        ("static", "^static:", 3600, L3),
    ];

    table
        .into_iter()
        .map(|(name, regex, ttl, layer)| {
            CachePattern::new(name, regex, Some(Duration::from_secs(ttl)), [name], layer)
        })
        .collect()
}

/// First pattern matching `key`, in registration order.
pub fn first_match<'a>(patterns: &'a [CachePattern], key: &str) -> Option<&'a CachePattern> {
    patterns.iter().find(|pattern| pattern.matches(key))
}
