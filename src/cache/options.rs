//! Write options shared by single stores and the orchestrator.

use std::time::Duration;

use serde_json::Value;

/// Options for a write.
///
/// `partition` is only consulted by the orchestrator; single stores ignore it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
    pub metadata: Option<Value>,
    pub partition: Option<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_ttl_secs(self, secs: u64) -> Self {
        self.with_ttl(Duration::from_secs(secs))
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn in_partition(mut self, layer: impl Into<String>) -> Self {
        self.partition = Some(layer.into());
        self
    }
}
