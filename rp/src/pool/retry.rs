//! Retry scheduling
//!
//! A failed runner waits out its backoff in its own tokio task, so waiting
//! never occupies a worker slot, then re-enters the shared queue behind
//! whatever is already there.

use std::sync::Arc;

use tracing::debug;

use super::core::Shared;
use super::queue::Runner;

/// Advance the runner's backoff and spawn its delayed resubmission
///
/// The shutdown signal cancels both the wait and a push blocked on a full
/// queue; a cancelled runner is abandoned.
pub(crate) fn schedule(shared: Arc<Shared>, mut runner: Runner) {
    let base = runner.next_backoff;
    runner.next_backoff = shared.backoff.grow(base);
    runner.retry_count += 1;
    let delay = shared.backoff.jittered(base);

    debug!(
        retry_count = runner.retry_count,
        ?base,
        ?delay,
        next_backoff = ?runner.next_backoff,
        "retry::schedule: called"
    );
    shared.stats.retry_started();

    tokio::spawn(async move {
        let mut shutdown = shared.shutdown.listener();

        let runner = tokio::select! {
            biased;
            _ = shutdown.cancelled() => None,
            _ = tokio::time::sleep(delay) => Some(runner),
        };

        match runner {
            Some(runner) => {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        debug!("retry::schedule: shutdown while queue full, dropping runner");
                        shared.abandon(1);
                    }
                    result = shared.queue.push(runner) => {
                        if result.is_err() {
                            debug!("retry::schedule: queue closed, dropping runner");
                            shared.abandon(1);
                        }
                    }
                }
            }
            None => {
                debug!("retry::schedule: shutdown during backoff, dropping runner");
                shared.abandon(1);
            }
        }

        shared.stats.retry_finished();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::pool::{Manager, PoolConfig};
    use crate::task::Task;

    /// Task that fails `failures` times, recording when each run happened
    fn flaky(failures: u32, runs: Arc<std::sync::Mutex<Vec<Instant>>>) -> Arc<dyn Task> {
        let left = Arc::new(AtomicU32::new(failures));
        Arc::new(move || {
            let left = left.clone();
            let runs = runs.clone();
            async move {
                runs.lock().unwrap().push(Instant::now());
                if left.load(Ordering::SeqCst) > 0 {
                    left.fetch_sub(1, Ordering::SeqCst);
                    return Err(eyre::eyre!("not yet"));
                }
                Ok(())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delays_follow_backoff() {
        let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
        let pool = Manager::new(PoolConfig {
            max_retry_count: 4,
            backoff_multiplier: 2.0,
            backoff_jitter: 0.1,
            seed: Some(42),
            ..PoolConfig::new(1, 1)
        })
        .unwrap();

        pool.start();
        pool.submit(flaky(3, runs.clone())).await;
        pool.stop().await;

        let runs = runs.lock().unwrap();
        assert_eq!(runs.len(), 4);

        // Stored backoff doubles: 1s, 2s, 4s, each jittered by at most 10%
        for (i, base_ms) in [1000u64, 2000, 4000].into_iter().enumerate() {
            let gap = runs[i + 1] - runs[i];
            let low = Duration::from_millis(base_ms * 9 / 10);
            let high = Duration::from_millis(base_ms * 11 / 10 + 5);
            assert!(gap >= low && gap <= high, "retry {i}: gap {gap:?} outside {low:?}..={high:?}");
        }

        let stats = pool.stats();
        assert_eq!(stats.succeeded, 1);
        assert_eq!(stats.retried, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_do_not_hold_workers() {
        let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
        let pool = Manager::new(PoolConfig {
            max_retry_count: 1,
            ..PoolConfig::new(1, 8)
        })
        .unwrap();
        pool.start();

        // Every task fails once; with a single worker, all first runs must
        // happen before any backoff has elapsed.
        for _ in 0..5 {
            pool.submit(flaky(1, runs.clone())).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.lock().unwrap().len(), 5);

        pool.stop().await;
        assert_eq!(runs.lock().unwrap().len(), 10);
        assert_eq!(pool.stats().succeeded, 5);
        assert_eq!(pool.stats().peak_retry_waits, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_backoff() {
        let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
        let pool = Manager::new(PoolConfig {
            max_retry_count: 5,
            ..PoolConfig::new(1, 1)
        })
        .unwrap();
        pool.start();
        pool.submit(flaky(10, runs.clone())).await;

        // First run fails, its retry is now waiting ~1s
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(runs.lock().unwrap().len(), 1);

        pool.stop_immediately().await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(runs.lock().unwrap().len(), 1);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.stats().abandoned, 1);
    }
}
