//! Synthetic flaky workload used by `rp run`

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use eyre::{Context, eyre};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::pool::{Manager, PoolConfig, PoolStats};
use crate::task::Task;

/// Task that fails a fixed number of times before succeeding
#[derive(Debug)]
pub struct FlakyTask {
    id: usize,
    failures_left: AtomicU32,
    duration: Duration,
    runs: AtomicU32,
}

impl FlakyTask {
    pub fn new(id: usize, failures: u32, duration: Duration) -> Self {
        Self {
            id,
            failures_left: AtomicU32::new(failures),
            duration,
            runs: AtomicU32::new(0),
        }
    }

    /// How many times the task has been run
    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Task for FlakyTask {
    async fn run(&self) -> eyre::Result<()> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.duration).await;

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(eyre!("task {} failed on run {}", self.id, run));
        }
        debug!(task = self.id, run, "FlakyTask::run: succeeded");
        Ok(())
    }
}

/// Build the workload: each task fails a geometric number of times with
/// probability `fail_rate`, capped at `max_failures`
pub fn workload(config: &DemoConfig, seed: Option<u64>) -> Vec<Arc<FlakyTask>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let fail_rate = if config.fail_rate.is_nan() {
        0.0
    } else {
        config.fail_rate.clamp(0.0, 1.0)
    };
    let duration = Duration::from_millis(config.task_duration_ms);

    (0..config.tasks)
        .map(|id| {
            let mut failures = 0;
            while failures < config.max_failures && rng.random_bool(fail_rate) {
                failures += 1;
            }
            Arc::new(FlakyTask::new(id, failures, duration))
        })
        .collect()
}

/// Run the workload through a pool built from `pool_config`
///
/// With `force_stop_after` the pool is stopped immediately once that much
/// time has passed after the last submission; otherwise it drains.
pub async fn run(
    pool_config: PoolConfig,
    demo: &DemoConfig,
    force_stop_after: Option<Duration>,
) -> eyre::Result<PoolStats> {
    let tasks = workload(demo, pool_config.seed);
    let manager = Manager::new(pool_config).context("Invalid pool configuration")?;

    manager.start();
    for task in &tasks {
        manager.submit(task.clone()).await;
    }
    info!(submitted = tasks.len(), "Workload submitted");

    match force_stop_after {
        Some(after) => {
            tokio::time::sleep(after).await;
            manager.stop_immediately().await;
        }
        None => manager.stop().await,
    }

    let total_runs: u32 = tasks.iter().map(|t| t.runs()).sum();
    info!(total_runs, "Workload finished");
    Ok(manager.stats())
}
