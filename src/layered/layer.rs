//! Orchestrator's view of a store.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::LayerBackend;

/// A named, prioritized store. Lower priority numbers are faster: they are
/// probed first on reads and receive promotions.
pub struct CacheLayer<T> {
    pub name: String,
    pub priority: u32,
    /// Disabled layers are skipped for reads and writes but keep their data
    pub enabled: bool,
    pub store: Arc<dyn LayerBackend<T>>,
}

impl<T> Clone for CacheLayer<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            priority: self.priority,
            enabled: self.enabled,
            store: Arc::clone(&self.store),
        }
    }
}

impl<T> fmt::Debug for CacheLayer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLayer")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl<T> CacheLayer<T> {
    pub fn info(&self) -> LayerInfo {
        LayerInfo {
            name: self.name.clone(),
            priority: self.priority,
            enabled: self.enabled,
        }
    }
}

/// Serializable description of a registered layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerInfo {
    pub name: String,
    pub priority: u32,
    pub enabled: bool,
}
