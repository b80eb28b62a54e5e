//! retrypool - bounded worker pool with cooperative shutdown and retry
//!
//! A [`Manager`] owns a bounded queue and a fixed set of tokio workers.
//! Callers submit [`Task`]s; a task that fails is rescheduled after a
//! randomized, geometrically growing delay until it succeeds or runs out of
//! retries.
//!
//! # Shutdown
//!
//! - [`Manager::stop`] stops admission and waits until every submitted task
//!   has succeeded or given up, pending retries included
//! - [`Manager::stop_immediately`] stops admission, discards queued tasks and
//!   cancels pending retries without waiting
//!
//! Submissions after either stop are dropped silently, and so are the errors
//! of tasks that exhaust their retries unless the caller subscribes with
//! [`Manager::subscribe_failures`].
//!
//! # Modules
//!
//! - [`pool`] - manager, workers, queue, retry scheduling
//! - [`task`] - the `Task` trait
//! - [`config`] - file configuration for the `rp` binary
//! - [`demo`] - synthetic flaky workload driven by `rp run`
//! - [`cli`] - command-line interface for the `rp` binary

pub mod cli;
pub mod config;
pub mod demo;
pub mod pool;
pub mod task;

pub use config::{Config, DemoConfig};
pub use pool::{ConfigError, Manager, PoolConfig, PoolState, PoolStats, TaskFailure};
pub use task::Task;
