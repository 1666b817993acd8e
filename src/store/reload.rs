//! Hot-reloaded configuration snapshots.
//!
//! ```text
//! notify event → Debouncer (collapse bursts) → Reloadable::reload
//!     → ConfigStore::load_with_environment
//!     → Ok(Some)  : atomic swap of Arc<T>, generation += 1
//!     → Ok(None)  : keep current snapshot
//!     → Err       : keep current snapshot, log
//! ```

use arc_swap::ArcSwapOption;
use serde::de::DeserializeOwned;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::Result;
use crate::store::{ConfigDescriptor, ConfigStore};

/// Runs an action once a burst of triggers has been quiet for `window`.
///
/// The worker thread exits when the debouncer is dropped or the action
/// returns `false`.
pub struct Debouncer {
    tx: mpsc::Sender<()>,
}

impl Debouncer {
    pub fn spawn<F>(window: Duration, mut action: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        thread::spawn(move || {
            while rx.recv().is_ok() {
                loop {
                    match rx.recv_timeout(window) {
                        Ok(()) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                if !action() {
                    return;
                }
            }
        });
        Self { tx }
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

/// A configuration value kept current by re-reading its file on change.
///
/// Readers always see a complete snapshot; a failed reload keeps the
/// previous one.
pub struct Reloadable<T> {
    inner: Arc<ReloadInner<T>>,
}

impl<T> Clone for Reloadable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ReloadInner<T> {
    store: ConfigStore,
    descriptor: ConfigDescriptor,
    current: ArcSwapOption<T>,
    generation: watch::Sender<u64>,
}

impl<T> Reloadable<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Perform the initial load. Errors here are returned to the caller.
    pub fn load(store: ConfigStore, descriptor: ConfigDescriptor) -> Result<Self> {
        let initial = store.load_with_environment::<T>(&descriptor)?;
        let (generation, _) = watch::channel(0);
        Ok(Self {
            inner: Arc::new(ReloadInner {
                store,
                descriptor,
                current: ArcSwapOption::new(initial.map(Arc::new)),
                generation,
            }),
        })
    }

    /// Current snapshot, `None` if the config has never existed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.current.load_full()
    }

    pub fn descriptor(&self) -> &ConfigDescriptor {
        &self.inner.descriptor
    }

    /// Number of successful reloads so far.
    pub fn generation(&self) -> u64 {
        *self.inner.generation.borrow()
    }

    /// Receiver that changes whenever a new snapshot is installed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.generation.subscribe()
    }

    /// Re-read the config now. Returns whether a new snapshot was installed.
    pub fn reload(&self) -> bool {
        self.inner.reload()
    }

    /// Reload on file changes, collapsing bursts within `debounce`.
    pub fn watch(&self, debounce: Duration) -> Result<()> {
        let weak: Weak<ReloadInner<T>> = Arc::downgrade(&self.inner);
        let debouncer = Debouncer::spawn(debounce, move || match weak.upgrade() {
            Some(inner) => {
                inner.reload();
                true
            }
            None => false,
        });
        self.inner
            .store
            .watch(&self.inner.descriptor, move |_| debouncer.trigger())
    }

    pub fn unwatch(&self) -> bool {
        self.inner.store.stop_watching(&self.inner.descriptor)
    }
}

impl<T> ReloadInner<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    fn reload(&self) -> bool {
        let path = self.descriptor.base_path();
        self.store.invalidate(&self.descriptor);
        match self.store.load_with_environment::<T>(&self.descriptor) {
            Ok(Some(value)) => {
                self.current.store(Some(Arc::new(value)));
                self.generation.send_modify(|g| *g += 1);
                tracing::info!(path = %path.display(), "Config reloaded");
                true
            }
            Ok(None) => {
                tracing::warn!(path = %path.display(), "Config file vanished. Keeping current configuration.");
                false
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Failed to reload config: {}. Keeping current configuration.", e);
                false
            }
        }
    }
}
