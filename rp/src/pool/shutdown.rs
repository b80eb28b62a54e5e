//! One-shot cancellation signal shared by workers and retry waits

use tokio::sync::watch;
use tracing::debug;

/// Cancellation signal owned by the pool
///
/// Fired at most once. Once fired it stays fired.
#[derive(Debug)]
pub(crate) struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Fire the signal; returns false if it was already fired
    pub(crate) fn fire(&self) -> bool {
        let fired = self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        });
        debug!(fired, "Shutdown::fire: called");
        fired
    }

    #[cfg(test)]
    pub(crate) fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// New listener for the signal
    pub(crate) fn listener(&self) -> ShutdownListener {
        ShutdownListener { rx: self.tx.subscribe() }
    }
}

/// Receiving side of [`Shutdown`]
#[derive(Debug, Clone)]
pub(crate) struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolve once the signal has fired
    ///
    /// Also resolves if the owning [`Shutdown`] is gone.
    pub(crate) async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}
