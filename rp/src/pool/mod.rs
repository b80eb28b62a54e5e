//! Bounded worker pool with retry
//!
//! Submitted tasks go through a bounded queue to a fixed set of workers.
//! A failed task is retried after a jittered exponential backoff, up to the
//! configured retry count, without holding a worker while it waits.

mod backoff;
mod config;
mod core;
mod error;
mod queue;
mod retry;
mod shutdown;
mod stats;
mod worker;

pub use config::{BACKOFF_FLOOR_MS, DEFAULT_BACKOFF_JITTER, DEFAULT_BACKOFF_MULTIPLIER, PoolConfig};
pub use self::core::{Manager, PoolState};
pub use error::{ConfigError, TaskFailure};
pub use stats::PoolStats;
