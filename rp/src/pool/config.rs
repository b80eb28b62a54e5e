//! Pool configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::error::ConfigError;

/// Smallest backoff the pool will ever wait; lower minimums are raised to it
pub const BACKOFF_FLOOR_MS: u64 = 1000;

/// Default growth factor between consecutive retry delays
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.6;

/// Default jitter fraction applied around each retry delay
pub const DEFAULT_BACKOFF_JITTER: f64 = 0.2;

/// Pool configuration
///
/// Worker count and queue capacity are signed so that zero and negative
/// values can be reported back as a [`ConfigError`] instead of failing to
/// deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PoolConfig {
    /// Number of concurrent workers
    #[serde(default = "default_worker_count")]
    pub worker_count: i64,

    /// Number of pending runners the queue holds before submit waits
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: i64,

    /// Retries allowed after the first failed run (0 disables retry)
    #[serde(default)]
    pub max_retry_count: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    /// Ceiling for the retry delay, in milliseconds
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,

    /// Growth factor between consecutive retry delays
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Fraction of the delay used as random jitter in both directions
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,

    /// Seed for the jitter source (OS entropy when unset)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_worker_count() -> i64 {
    1
}

fn default_queue_capacity() -> i64 {
    1
}

fn default_min_backoff_ms() -> u64 {
    BACKOFF_FLOOR_MS
}

fn default_backoff_multiplier() -> f64 {
    DEFAULT_BACKOFF_MULTIPLIER
}

fn default_backoff_jitter() -> f64 {
    DEFAULT_BACKOFF_JITTER
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 1,
            queue_capacity: 1,
            max_retry_count: 0,
            min_backoff_ms: BACKOFF_FLOOR_MS,
            max_backoff_ms: None,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            backoff_jitter: DEFAULT_BACKOFF_JITTER,
            seed: None,
        }
    }
}

impl PoolConfig {
    /// Config with the two required settings and defaults for the rest
    pub fn new(worker_count: i64, queue_capacity: i64) -> Self {
        Self {
            worker_count,
            queue_capacity,
            ..Default::default()
        }
    }

    /// Reject settings the pool cannot be built with
    pub fn validate(&self) -> Result<(), ConfigError> {
        debug!(worker_count = self.worker_count, queue_capacity = self.queue_capacity, "validate: called");
        if self.worker_count <= 0 {
            return Err(ConfigError::InvalidWorkerCount(self.worker_count));
        }
        if self.queue_capacity <= 0 {
            return Err(ConfigError::InvalidQueueCapacity(self.queue_capacity));
        }
        Ok(())
    }

    /// Copy with out-of-range backoff settings replaced by their defaults
    ///
    /// - `min_backoff_ms` below the floor is raised to the floor
    /// - `max_backoff_ms` below the floor is treated as unset
    /// - `max_backoff_ms` below `min_backoff_ms` is raised to it
    /// - a multiplier that is not greater than 1 falls back to 1.6
    /// - a jitter outside the open interval (0, 1) falls back to 0.2
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();

        config.min_backoff_ms = config.min_backoff_ms.max(BACKOFF_FLOOR_MS);
        config.max_backoff_ms = config
            .max_backoff_ms
            .filter(|ms| *ms >= BACKOFF_FLOOR_MS)
            .map(|ms| ms.max(config.min_backoff_ms));

        if !(config.backoff_multiplier.is_finite() && config.backoff_multiplier > 1.0) {
            debug!(multiplier = config.backoff_multiplier, "normalized: multiplier out of range, using default");
            config.backoff_multiplier = DEFAULT_BACKOFF_MULTIPLIER;
        }

        if !(config.backoff_jitter > 0.0 && config.backoff_jitter < 1.0) {
            debug!(jitter = config.backoff_jitter, "normalized: jitter out of range, using default");
            config.backoff_jitter = DEFAULT_BACKOFF_JITTER;
        }

        config
    }

    /// Delay before the first retry
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    /// Retry delay ceiling, if one is configured
    pub fn max_backoff(&self) -> Option<Duration> {
        self.max_backoff_ms.map(Duration::from_millis)
    }
}
