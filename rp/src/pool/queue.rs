//! Runner and the bounded queue shared by submitters and workers

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use crate::task::Task;

/// A task plus its retry bookkeeping
pub(crate) struct Runner {
    pub(crate) task: Arc<dyn Task>,

    /// Retries already scheduled for this task
    pub(crate) retry_count: u32,

    /// Delay the next retry will wait before jitter
    pub(crate) next_backoff: Duration,
}

impl Runner {
    pub(crate) fn new(task: Arc<dyn Task>, min_backoff: Duration) -> Self {
        Self {
            task,
            retry_count: 0,
            next_backoff: min_backoff,
        }
    }

    /// Runs made so far, counting the first one
    pub(crate) fn attempts(&self) -> u32 {
        self.retry_count + 1
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("retry_count", &self.retry_count)
            .field("next_backoff", &self.next_backoff)
            .finish_non_exhaustive()
    }
}

/// Bounded multi-producer multi-consumer queue of runners
///
/// Workers share the single receiver; whichever worker is idle takes the
/// next runner. Retries re-enter at the back, so ordering is only roughly
/// FIFO.
pub(crate) struct Queue {
    tx: mpsc::Sender<Runner>,
    rx: Mutex<mpsc::Receiver<Runner>>,
    capacity: usize,
}

impl Queue {
    pub(crate) fn new(capacity: usize) -> Self {
        debug!(capacity, "Queue::new: called");
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push a runner, waiting while the queue is full
    ///
    /// Hands the runner back if the queue has been closed.
    pub(crate) async fn push(&self, runner: Runner) -> Result<(), Runner> {
        self.tx.send(runner).await.map_err(|e| e.0)
    }

    /// Next runner, or `None` once the queue is closed and empty
    pub(crate) async fn pop(&self) -> Option<Runner> {
        self.rx.lock().await.recv().await
    }

    /// Close the queue and hand back every runner still in it
    ///
    /// Pushes after this fail. Waits for a worker blocked in [`Queue::pop`]
    /// to release the receiver, so fire the shutdown signal first.
    pub(crate) async fn close(&self) -> Vec<Runner> {
        let mut rx = self.rx.lock().await;
        rx.close();

        let mut discarded = Vec::new();
        while let Ok(runner) = rx.try_recv() {
            discarded.push(runner);
        }
        debug!(discarded = discarded.len(), "Queue::close: closed");
        discarded
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Runners currently waiting in the queue
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
