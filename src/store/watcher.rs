//! Configuration file watcher for hot reload.
//!
//! Each store keeps at most one active watcher per resolved config path.
//! Delivery is platform-driven: one save can produce zero, one or several
//! notifications, so callbacks should treat an event as "re-read now".

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::observability::metrics;
use crate::store::{invalidate_cached, ConfigDescriptor, ConfigStore};

/// What happened to a watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
}

/// Notification delivered to a watch callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

type Callback = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

struct WatchRegistration {
    _watcher: RecommendedWatcher,
    active: Arc<AtomicBool>,
}

impl Drop for WatchRegistration {
    fn drop(&mut self) {
        // Events already queued by the platform are dropped on the floor.
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Table of active watchers keyed by resolved config path.
#[derive(Default)]
pub(crate) struct WatchRegistry {
    entries: Mutex<HashMap<PathBuf, WatchRegistration>>,
}

impl WatchRegistry {
    fn register(&self, key: PathBuf, directory: &Path, file_name: OsString, callback: Callback) -> Result<()> {
        let mut entries = self.entries.lock();
        if let Some(previous) = entries.remove(&key) {
            drop(previous);
            tracing::debug!(path = %key.display(), "Replaced existing config watcher");
        }

        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if !flag.load(Ordering::SeqCst) {
                    return;
                }
                match res {
                    Ok(event) => {
                        let kind = match event.kind {
                            EventKind::Create(_) => ChangeKind::Created,
                            EventKind::Modify(_) => ChangeKind::Modified,
                            _ => return,
                        };
                        let Some(path) = event
                            .paths
                            .iter()
                            .find(|p| p.file_name() == Some(file_name.as_os_str()))
                        else {
                            return;
                        };
                        metrics::record_watch_event();
                        tracing::info!(path = %path.display(), ?kind, "Config file change detected");
                        callback(ChangeEvent {
                            path: path.clone(),
                            kind,
                        });
                    }
                    Err(e) => tracing::error!("Watch error: {:?}", e),
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| watch_error(directory, e))?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(directory, e))?;

        entries.insert(
            key.clone(),
            WatchRegistration {
                _watcher: watcher,
                active,
            },
        );
        tracing::info!(path = %key.display(), "Config watcher started");
        Ok(())
    }

    fn remove(&self, key: &Path) -> bool {
        let removed = self.entries.lock().remove(key);
        if removed.is_some() {
            tracing::info!(path = %key.display(), "Config watcher stopped");
        }
        removed.is_some()
    }

    fn contains(&self, key: &Path) -> bool {
        self.entries.lock().contains_key(key)
    }

    fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.entries.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

fn watch_error(directory: &Path, e: notify::Error) -> ConfigError {
    ConfigError::io(directory, std::io::Error::other(e.to_string()))
}

impl ConfigStore {
    /// Invoke `callback` whenever the base file is created or modified.
    ///
    /// Replaces any watcher already registered for the same resolved path.
    /// The callback runs on a platform thread and must not block for long.
    pub fn watch<F>(&self, descriptor: &ConfigDescriptor, callback: F) -> Result<()>
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        let key = descriptor.resolved_path();
        let directory = key
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| descriptor.directory.clone());
        std::fs::create_dir_all(&directory).map_err(|e| ConfigError::io(&directory, e))?;

        let file_name = OsString::from(&descriptor.file_name);
        let cache = self.document_cache().cloned();
        let locks = self.path_locks().clone();
        let base = descriptor.base_path();
        let resolved = key.clone();
        let handler: Callback = Arc::new(move |event: ChangeEvent| {
            if let Some(cache) = &cache {
                let lock = locks.lock_for(&base);
                let _guard = lock.lock();
                invalidate_cached(cache, &resolved);
            }
            callback(event);
        });
        self.watches().register(key, &directory, file_name, handler)
    }

    /// Stop watching `descriptor`. Returns whether a watcher was removed.
    pub fn stop_watching(&self, descriptor: &ConfigDescriptor) -> bool {
        self.watches().remove(&descriptor.resolved_path())
    }

    pub fn is_watching(&self, descriptor: &ConfigDescriptor) -> bool {
        self.watches().contains(&descriptor.resolved_path())
    }

    /// Resolved paths with an active watcher, sorted.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watches().paths()
    }
}
