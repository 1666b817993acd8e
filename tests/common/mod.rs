//! Shared utilities for integration tests.

use std::path::Path;
use std::time::{Duration, Instant};

use layered_config::{ConfigStore, DocumentCache, StoreOptions};
use tempfile::TempDir;

/// A store rooted in a fresh temporary directory.
pub fn temp_store() -> (TempDir, ConfigStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::new(StoreOptions {
        base_dir: dir.path().join("Configs"),
        ..StoreOptions::default()
    });
    (dir, store)
}

/// Like [`temp_store`], but memoizing loaded documents.
#[allow(dead_code)]
pub fn temp_cached_store() -> (TempDir, ConfigStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ConfigStore::with_cache(
        StoreOptions {
            base_dir: dir.path().join("Configs"),
            ..StoreOptions::default()
        },
        DocumentCache::new(),
    );
    (dir, store)
}

/// Write `contents` to `dir/name`, creating `dir` if needed.
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, contents: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), contents).unwrap();
}

/// Poll `check` until it holds or `timeout` elapses.
#[allow(dead_code)]
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut check: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(25));
    }
    check()
}
