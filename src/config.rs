//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::StoreConfig;
use crate::tasks::DEFAULT_SWEEP_INTERVAL;

const MIB: usize = 1024 * 1024;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Memory ceiling of the fastest layer, in bytes
    pub l1_max_memory: usize,
    pub l2_max_memory: usize,
    /// Memory ceiling of the slowest layer, in bytes
    pub l3_max_memory: usize,
    /// Eviction starts above this percentage of a layer's ceiling
    pub eviction_threshold: u8,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `L1_MAX_MEMORY` - L1 ceiling in bytes (default: 16 MiB)
    /// - `L2_MAX_MEMORY` - L2 ceiling in bytes (default: 64 MiB)
    /// - `L3_MAX_MEMORY` - L3 ceiling in bytes (default: 256 MiB)
    /// - `EVICTION_THRESHOLD` - Integer percentage, 1 to 100 (default: 90)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 300)
    ///
    /// Unparseable or out-of-range values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            l1_max_memory: env_or("L1_MAX_MEMORY", defaults.l1_max_memory),
            l2_max_memory: env_or("L2_MAX_MEMORY", defaults.l2_max_memory),
            l3_max_memory: env_or("L3_MAX_MEMORY", defaults.l3_max_memory),
            eviction_threshold: Some(env_or("EVICTION_THRESHOLD", defaults.eviction_threshold))
                .filter(|pct| (1..=100).contains(pct))
                .unwrap_or(defaults.eviction_threshold),
            sweep_interval: Some(env_or("SWEEP_INTERVAL", defaults.sweep_interval))
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.sweep_interval),
        }
    }

    /// Store settings for a layer with the given ceiling.
    pub fn store_config(&self, max_memory_bytes: usize) -> StoreConfig {
        StoreConfig {
            eviction_threshold: self.eviction_threshold,
            ..StoreConfig::with_max_memory(max_memory_bytes)
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }
}

fn env_or<V: FromStr>(name: &str, default: V) -> V {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            l1_max_memory: 16 * MIB,
            l2_max_memory: 64 * MIB,
            l3_max_memory: 256 * MIB,
            eviction_threshold: 90,
            sweep_interval: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}
