//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the cache is alive.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries at a fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, SweepGuard, DEFAULT_SWEEP_INTERVAL};
