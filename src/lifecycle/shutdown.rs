//! Reload reporters and their shutdown.
//!
//! Each hot-reloaded document gets a task that logs every new snapshot
//! generation. All of them listen on one broadcast channel and exit when
//! the agent stops.

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::store::Reloadable;

/// Stop signal shared by the agent's reporter tasks.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Log each snapshot `document` installs until [`Shutdown::trigger`].
    ///
    /// The task also ends when the document itself is dropped. Must be
    /// called from inside a Tokio runtime.
    pub fn spawn_reporter<T>(&self, document: &Reloadable<T>) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let mut changes = document.subscribe();
        let mut stop = self.tx.subscribe();
        let path = document.descriptor().base_path();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let generation = *changes.borrow_and_update();
                        tracing::info!(path = %path.display(), generation, "Configuration updated");
                    }
                    _ = stop.recv() => break,
                }
            }
            tracing::debug!(path = %path.display(), "Reload reporter stopped");
        })
    }

    /// Stop every reporter. Safe to call more than once.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Reporters still running.
    pub fn active_reporters(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
