//! Pool statistics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::Serialize;

/// Snapshot of pool counters
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Tasks accepted by submit
    pub submitted: u64,
    /// Tasks dropped because admission was closed
    pub rejected: u64,
    /// Tasks that eventually ran successfully
    pub succeeded: u64,
    /// Retries scheduled
    pub retried: u64,
    /// Tasks that failed on every allowed attempt
    pub given_up: u64,
    /// Tasks dropped by shutdown before reaching success or give-up
    pub abandoned: u64,
    /// Most retry waits in flight at once
    pub peak_retry_waits: usize,
}

/// Live counters behind [`PoolStats`]
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    succeeded: AtomicU64,
    retried: AtomicU64,
    given_up: AtomicU64,
    abandoned: AtomicU64,
    retry_waits: AtomicUsize,
    peak_retry_waits: AtomicUsize,
}

impl StatsCounters {
    pub(crate) fn submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn given_up(&self) {
        self.given_up.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn abandoned(&self, count: u64) {
        self.abandoned.fetch_add(count, Ordering::Relaxed);
    }

    /// A retry wait began
    pub(crate) fn retry_started(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
        let waiting = self.retry_waits.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_retry_waits.fetch_max(waiting, Ordering::Relaxed);
    }

    /// A retry wait ended, delivered or not
    pub(crate) fn retry_finished(&self) {
        self.retry_waits.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn retry_waits(&self) -> usize {
        self.retry_waits.load(Ordering::Relaxed)
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            given_up: self.given_up.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            peak_retry_waits: self.peak_retry_waits.load(Ordering::Relaxed),
        }
    }
}
