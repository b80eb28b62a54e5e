//! Task trait - the unit of work handed to the pool
//!
//! A Task is owned by the caller and shared with the pool through an `Arc`.
//! The pool never constructs one; it only runs it, possibly several times in
//! sequence when retries are configured.

use std::future::Future;

use async_trait::async_trait;

/// A unit of work that runs to completion and reports success or failure
///
/// Implementations must be safe to run concurrently with other Task
/// instances. A single instance is never run twice at the same time, but may
/// be run again after a failed attempt.
#[async_trait]
pub trait Task: Send + Sync {
    /// Run the task once
    async fn run(&self) -> eyre::Result<()>;
}

/// Any async closure returning `eyre::Result<()>` is a Task
#[async_trait]
impl<F, Fut> Task for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = eyre::Result<()>> + Send + 'static,
{
    async fn run(&self) -> eyre::Result<()> {
        (self)().await
    }
}
