use crate::metrics_defs::{STICKY_SWEEP_FAILED, STICKY_SWEEP_REMOVED};
use crate::store::StickyStore;
use rand::Rng;
use shared::counter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

#[derive(Debug)]
enum Command {
    // Delete expired sticky mappings.
    Sweep,
    // Stop the worker once the pending sweep, if any, has run.
    Shutdown,
}

/// Runs expired-mapping sweeps on a background task.
///
/// Requests never wait: the channel holds at most one pending sweep, and
/// further requests while one is queued are dropped since they would do the
/// same work.
#[derive(Clone)]
pub struct Sweeper {
    tx: mpsc::Sender<Command>,
    probability: f64,
}

impl Sweeper {
    /// Spawns the worker. Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn StickyStore>, probability: f64) -> Self {
        let (tx, rx) = mpsc::channel::<Command>(1);
        tokio::spawn(run_worker(store, rx));

        Sweeper {
            tx,
            probability: probability.clamp(0.0, 1.0),
        }
    }

    /// Requests a sweep with the configured probability. Returns whether a
    /// sweep was queued.
    pub fn maybe_request(&self) -> bool {
        if !self.roll() {
            return false;
        }
        self.request()
    }

    /// Queues a sweep without waiting. Returns whether it was queued.
    pub fn request(&self) -> bool {
        match self.tx.try_send(Command::Sweep) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("sticky sweeper is not running");
                false
            }
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }

    fn roll(&self) -> bool {
        self.probability > 0.0 && rand::thread_rng().gen_bool(self.probability)
    }
}

async fn run_worker(store: Arc<dyn StickyStore>, mut rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Sweep => match store.cleanup_expired().await {
                Ok(removed) => {
                    counter!(STICKY_SWEEP_REMOVED).increment(removed as u64);
                    tracing::debug!(removed, "swept expired sticky mappings");
                }
                Err(e) => {
                    counter!(STICKY_SWEEP_FAILED).increment(1);
                    tracing::warn!(error = %e, "sticky mapping sweep failed");
                }
            },
            Command::Shutdown => break,
        }
    }
}
