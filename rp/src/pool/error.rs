//! Pool error types

use thiserror::Error;

/// Errors raised when building a pool
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Worker count must be greater than zero, got {0}")]
    InvalidWorkerCount(i64),

    #[error("Queue capacity must be greater than zero, got {0}")]
    InvalidQueueCapacity(i64),
}

/// A task that failed on every allowed attempt
///
/// Only delivered to callers that opted in through
/// [`Manager::subscribe_failures`](super::Manager::subscribe_failures).
#[derive(Debug, Clone)]
pub struct TaskFailure {
    /// Total runs, including the first one
    pub attempts: u32,

    /// Rendered error of the last run
    pub error: String,
}
