//! Health report types.

use serde::Serialize;

use crate::layered::CacheMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Only when a layer's own probe fails; misses never make a cache unhealthy
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerHealth {
    pub name: String,
    pub enabled: bool,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub layer_count: usize,
    pub pattern_count: usize,
    pub metrics: CacheMetrics,
    pub layers: Vec<LayerHealth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub details: HealthDetails,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
