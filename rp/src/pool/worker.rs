//! Worker loop

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use super::core::Shared;
use super::queue::Runner;
use super::retry;
use super::shutdown::ShutdownListener;

/// One execution slot; pulls runners off the shared queue until shutdown
pub(crate) struct Worker {
    id: usize,
    shared: Arc<Shared>,
}

impl Worker {
    pub(crate) fn new(id: usize, shared: Arc<Shared>) -> Self {
        Self { id, shared }
    }

    pub(crate) async fn run(self) {
        debug!(worker = self.id, "Worker::run: started");
        let mut shutdown = self.shared.shutdown.listener();

        loop {
            let runner = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!(worker = self.id, "Worker::run: shutdown signalled");
                    break;
                }
                runner = self.shared.queue.pop() => match runner {
                    Some(runner) => runner,
                    None => {
                        debug!(worker = self.id, "Worker::run: queue closed");
                        break;
                    }
                },
            };

            self.execute(runner, &shutdown).await;
        }

        debug!(worker = self.id, "Worker::run: exiting");
    }

    /// Run the task once and route the runner by outcome
    async fn execute(&self, runner: Runner, shutdown: &ShutdownListener) {
        let outcome = AssertUnwindSafe(runner.task.run()).catch_unwind().await;

        let error = match outcome {
            Ok(Ok(())) => {
                debug!(worker = self.id, attempts = runner.attempts(), "Worker::execute: task succeeded");
                self.shared.succeed();
                return;
            }
            Ok(Err(e)) => e,
            Err(panic) => eyre::eyre!("task panicked: {}", panic_message(panic.as_ref())),
        };

        if runner.retry_count >= self.shared.config.max_retry_count {
            self.shared.give_up(runner, error);
        } else if shutdown.is_cancelled() {
            debug!(worker = self.id, error = %error, "Worker::execute: task failed during shutdown, not retrying");
            self.shared.abandon(1);
        } else {
            debug!(
                worker = self.id,
                retry_count = runner.retry_count,
                error = %error,
                "Worker::execute: task failed, scheduling retry"
            );
            retry::schedule(self.shared.clone(), runner);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
