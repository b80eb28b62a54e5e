//! Manager implementation

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::task::Task;

use super::backoff::Backoff;
use super::config::PoolConfig;
use super::error::{ConfigError, TaskFailure};
use super::queue::{Queue, Runner};
use super::shutdown::Shutdown;
use super::stats::{PoolStats, StatsCounters};
use super::worker::Worker;

/// Buffered failure notifications per subscriber before the oldest are dropped
const FAILURE_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle of a [`Manager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Built, workers not started; submissions are queued
    Created,
    /// Workers running
    Running,
    /// Graceful stop in progress; submissions are dropped
    Draining,
    /// Shut down; submissions are dropped
    Stopped,
}

impl PoolState {
    /// Whether new submissions are accepted
    pub fn is_admitting(&self) -> bool {
        matches!(self, PoolState::Created | PoolState::Running)
    }
}

/// State shared by the manager, its workers and pending retries
pub(crate) struct Shared {
    pub(crate) config: PoolConfig,
    pub(crate) queue: Queue,
    pub(crate) backoff: Backoff,
    pub(crate) shutdown: Shutdown,
    pub(crate) stats: StatsCounters,
    outstanding: watch::Sender<usize>,
    failures: broadcast::Sender<TaskFailure>,
}

impl Shared {
    fn admit(&self) {
        self.outstanding.send_modify(|n| *n += 1);
    }

    fn complete(&self, count: usize) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(count));
    }

    /// Runner finished successfully
    pub(crate) fn succeed(&self) {
        self.stats.succeeded();
        self.complete(1);
    }

    /// Runner failed with no retries left; the error goes nowhere unless
    /// someone subscribed to failures
    pub(crate) fn give_up(&self, runner: Runner, error: eyre::Report) {
        debug!(attempts = runner.attempts(), error = %error, "Shared::give_up: retries exhausted");
        self.stats.given_up();
        let _ = self.failures.send(TaskFailure {
            attempts: runner.attempts(),
            error: format!("{error:#}"),
        });
        self.complete(1);
    }

    /// Runners dropped by shutdown without reaching success or give-up
    pub(crate) fn abandon(&self, count: usize) {
        if count == 0 {
            return;
        }
        debug!(count, "Shared::abandon: dropping runners");
        self.stats.abandoned(count as u64);
        self.complete(count);
    }
}

/// Bounded worker pool with retry and cooperative shutdown
///
/// ```no_run
/// # async fn demo() -> Result<(), retrypool::ConfigError> {
/// use std::sync::Arc;
/// use retrypool::{Manager, PoolConfig};
///
/// let pool = Manager::new(PoolConfig {
///     max_retry_count: 3,
///     ..PoolConfig::new(4, 16)
/// })?;
/// pool.start();
/// pool.submit(Arc::new(|| async { Ok::<_, eyre::Report>(()) })).await;
/// pool.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Manager {
    shared: Arc<Shared>,
    state: Mutex<PoolState>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Manager {
    /// Build a pool; workers are not started until [`Manager::start`]
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        debug!(?config, "Manager::new: called");
        config.validate()?;
        let config = config.normalized();

        let (outstanding, _) = watch::channel(0);
        let (failures, _) = broadcast::channel(FAILURE_CHANNEL_CAPACITY);

        let shared = Shared {
            queue: Queue::new(config.queue_capacity as usize),
            backoff: Backoff::from_config(&config),
            shutdown: Shutdown::new(),
            stats: StatsCounters::default(),
            outstanding,
            failures,
            config,
        };

        Ok(Self {
            shared: Arc::new(shared),
            state: Mutex::new(PoolState::Created),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Effective configuration, after defaults were applied
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn state(&self) -> PoolState {
        *self.lock_state()
    }

    /// Submitted tasks that have not yet succeeded, given up or been abandoned
    pub fn outstanding(&self) -> usize {
        *self.shared.outstanding.borrow()
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.stats.snapshot()
    }

    /// Receive a [`TaskFailure`] for every task that exhausts its retries
    ///
    /// Without a subscriber such failures are dropped silently.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<TaskFailure> {
        self.shared.failures.subscribe()
    }

    /// Queue a task
    ///
    /// Waits while the queue is full. Once a stop of either kind has begun,
    /// the task is dropped without running and without any error.
    pub async fn submit(&self, task: Arc<dyn Task>) {
        {
            let state = self.lock_state();
            if !state.is_admitting() {
                debug!(state = ?*state, "Manager::submit: not admitting, dropping task");
                self.shared.stats.rejected();
                return;
            }
            self.shared.admit();
        }
        self.shared.stats.submitted();

        let runner = Runner::new(task, self.shared.backoff.initial());
        if self.shared.queue.push(runner).await.is_err() {
            debug!("Manager::submit: queue closed while waiting, dropping task");
            self.shared.abandon(1);
        }
    }

    /// Spawn one worker per configured slot
    ///
    /// Must be called from within a tokio runtime. Calls after the first are
    /// ignored.
    pub fn start(&self) {
        let mut state = self.lock_state();
        if *state != PoolState::Created {
            warn!(state = ?*state, "Manager::start: already started, ignoring");
            return;
        }

        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for id in 0..self.shared.config.worker_count as usize {
            let worker = Worker::new(id, self.shared.clone());
            workers.push(tokio::spawn(worker.run()));
        }
        *state = PoolState::Running;

        info!(
            workers = workers.len(),
            queue_capacity = self.shared.queue.capacity(),
            max_retry_count = self.shared.config.max_retry_count,
            "Pool started"
        );
    }

    /// Stop admitting, wait for every outstanding task to finish, then shut
    /// the workers down
    ///
    /// Tasks waiting out a retry backoff count as outstanding, so this also
    /// waits for their remaining attempts.
    ///
    /// Tasks submitted before [`Manager::start`] are outstanding too. If the
    /// pool was never started, nothing can run them and this never returns;
    /// use [`Manager::stop_immediately`] to discard them instead.
    pub async fn stop(&self) {
        {
            let mut state = self.lock_state();
            match *state {
                PoolState::Stopped => {
                    debug!("Manager::stop: already stopped");
                    return;
                }
                PoolState::Created | PoolState::Running => *state = PoolState::Draining,
                PoolState::Draining => {}
            }
        }
        info!(outstanding = self.outstanding(), "Pool draining");

        let mut outstanding = self.shared.outstanding.subscribe();
        let _ = outstanding.wait_for(|n| *n == 0).await;

        self.shared.shutdown.fire();
        let leftover = self.shared.queue.close().await;
        self.shared.abandon(leftover.len());
        self.join_workers().await;

        *self.lock_state() = PoolState::Stopped;
        info!(stats = ?self.stats(), "Pool stopped");
    }

    /// Stop admitting and shut down without waiting
    ///
    /// Queued tasks are discarded unrun and pending retry waits are
    /// cancelled. A task already running finishes that run but is not
    /// retried; if that run fails with no retries left it is still given up.
    pub async fn stop_immediately(&self) {
        {
            let mut state = self.lock_state();
            if *state == PoolState::Stopped {
                debug!("Manager::stop_immediately: already stopped");
                return;
            }
            *state = PoolState::Stopped;
        }

        self.shared.shutdown.fire();
        let discarded = self.shared.queue.close().await;
        self.shared.abandon(discarded.len());

        info!(
            discarded = discarded.len(),
            retry_waits = self.shared.stats.retry_waits(),
            "Pool stopped immediately"
        );
    }

    async fn join_workers(&self) {
        let handles: Vec<_> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Worker task ended abnormally");
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        // Workers and retry waits hold the shared state; release them.
        self.shared.shutdown.fire();
    }
}
