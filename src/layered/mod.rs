//! Layered Cache Module
//!
//! Multi-layer orchestration on top of [`crate::cache`] stores: pattern
//! routing, promotion, invalidation fan-out, metrics and health.

mod health;
mod layer;
mod metrics;
mod orchestrator;
mod pattern;

pub use health::{HealthDetails, HealthReport, HealthStatus, LayerHealth};
pub use layer::{CacheLayer, LayerInfo};
pub use metrics::{CacheMetrics, GlobalMetrics, LayerMetrics, PatternMetrics};
pub use orchestrator::{GetOptions, Orchestrator, WarmEntry};
pub use pattern::{default_patterns, first_match, CachePattern, L1, L2, L3};
