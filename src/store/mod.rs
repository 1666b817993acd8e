//! Structured configuration store.
//!
//! # Data Flow
//! ```text
//! ConfigDescriptor → base path (+ environment path)
//!     → optional ExpiringCache lookup (memoized documents)
//!     → fs::read_optional → document::parse
//!     → document::merge(base, env)      load_with_environment only
//!     → document::decode<T>             typed value to the caller
//!
//! save / update_path / restore:
//!     per-path lock → build bytes → fs::write_atomic
//!
//! watch:
//!     notify watcher on the directory → filter by file name
//!     → caller callback (or reload::Reloadable re-reads and swaps)
//! ```
//!
//! # Design Decisions
//! - A missing file is "absent", never an error
//! - Writes are atomic renames; a failed write leaves the old file intact
//! - Read-modify-write operations on one path are serialized in-process,
//!   and so is filling the memo cache on a miss
//! - Watch registrations live in the store instance, not in global state
//! - Memoized documents are dropped on every write through this store and on
//!   every watch event; edits made by other processes without a watcher are
//!   only seen once the entry's TTL runs out

pub mod backup;
pub mod descriptor;
pub(crate) mod fs;
pub mod reload;
pub mod watcher;

pub use descriptor::ConfigDescriptor;
pub use reload::{Debouncer, Reloadable};
pub use watcher::{ChangeEvent, ChangeKind};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::ExpiringCache;
use crate::document::{self, Document};
use crate::error::Result;
use crate::observability::metrics;
use crate::settings::schema::StoreSettings;
use watcher::WatchRegistry;

/// Options controlling how a [`ConfigStore`] reads and writes documents.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Directory used by [`ConfigStore::descriptor`].
    pub base_dir: PathBuf,
    /// Name of the backup subdirectory next to each config file.
    pub backup_dir_name: String,
    /// Match struct field names ignoring case when decoding.
    pub case_insensitive: bool,
    /// Indent documents on write.
    pub indented: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("Configs"),
            backup_dir_name: "Backups".to_string(),
            case_insensitive: true,
            indented: true,
        }
    }
}

impl From<&StoreSettings> for StoreOptions {
    fn from(settings: &StoreSettings) -> Self {
        Self {
            base_dir: settings.base_dir.clone(),
            backup_dir_name: settings.backup_dir_name.clone(),
            case_insensitive: settings.case_insensitive,
            indented: settings.indented,
        }
    }
}

/// Loads, saves, updates, backs up and watches structured config files.
///
/// Cloning is cheap; clones share locks and watch registrations.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<StoreInner>,
}

/// Memoized documents keyed by resolved base path and environment.
pub type DocumentCache = ExpiringCache<(PathBuf, Option<String>), Document>;

struct StoreInner {
    options: StoreOptions,
    cache: Option<DocumentCache>,
    locks: fs::PathLocks,
    watches: WatchRegistry,
}

impl ConfigStore {
    pub fn new(options: StoreOptions) -> Self {
        Self::build(options, None)
    }

    /// A store that memoizes loaded documents in `cache`.
    pub fn with_cache(options: StoreOptions, cache: DocumentCache) -> Self {
        Self::build(options, Some(cache))
    }

    fn build(options: StoreOptions, cache: Option<DocumentCache>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                options,
                cache,
                locks: fs::PathLocks::default(),
                watches: WatchRegistry::default(),
            }),
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// Descriptor for `file_name` inside the configured base directory.
    pub fn descriptor(&self, file_name: impl Into<String>) -> ConfigDescriptor {
        ConfigDescriptor::new(file_name, self.inner.options.base_dir.clone())
    }

    /// Whether the base file exists.
    pub fn exists(&self, descriptor: &ConfigDescriptor) -> bool {
        descriptor.base_path().is_file()
    }

    /// Load and decode the base file. `None` if it does not exist.
    pub fn load<T: DeserializeOwned>(&self, descriptor: &ConfigDescriptor) -> Result<Option<T>> {
        self.load_document(descriptor)?
            .map(|doc| self.decode(doc))
            .transpose()
    }

    /// Load the base file as a raw document.
    pub fn load_document(&self, descriptor: &ConfigDescriptor) -> Result<Option<Document>> {
        self.memoized(descriptor, None, || read_document(&descriptor.base_path()))
    }

    /// Load the base file with the environment overlay merged on top.
    pub fn load_with_environment<T: DeserializeOwned>(
        &self,
        descriptor: &ConfigDescriptor,
    ) -> Result<Option<T>> {
        self.load_document_with_environment(descriptor)?
            .map(|doc| self.decode(doc))
            .transpose()
    }

    /// Raw-document form of [`ConfigStore::load_with_environment`].
    pub fn load_document_with_environment(
        &self,
        descriptor: &ConfigDescriptor,
    ) -> Result<Option<Document>> {
        let Some(env_path) = descriptor.environment_path() else {
            return self.load_document(descriptor);
        };

        self.memoized(descriptor, descriptor.environment.clone(), || {
            let base = read_document(&descriptor.base_path())?;
            let overlay = read_document(&env_path)?;
            Ok(match (base, overlay) {
                (Some(base), Some(overlay)) => Some(document::merge(base, overlay)),
                (Some(doc), None) | (None, Some(doc)) => Some(doc),
                (None, None) => None,
            })
        })
    }

    /// Drop every memoized document built from `descriptor`'s base file.
    pub fn invalidate(&self, descriptor: &ConfigDescriptor) {
        if let Some(cache) = &self.inner.cache {
            invalidate_cached(cache, &descriptor.resolved_path());
        }
    }

    pub(crate) fn document_cache(&self) -> Option<&DocumentCache> {
        self.inner.cache.as_ref()
    }

    fn memoized<F>(
        &self,
        descriptor: &ConfigDescriptor,
        environment: Option<String>,
        load: F,
    ) -> Result<Option<Document>>
    where
        F: FnOnce() -> Result<Option<Document>>,
    {
        let Some(cache) = &self.inner.cache else {
            return load();
        };

        let key = (descriptor.resolved_path(), environment);
        if let Some(doc) = cache.get(&key) {
            return Ok(Some(doc));
        }

        // Writes invalidate under the same lock, so a document read here
        // can never be inserted after the write that replaced it.
        let lock = self.lock_for(&descriptor.base_path());
        let _guard = lock.lock();
        if let Some(doc) = cache.get(&key) {
            return Ok(Some(doc));
        }
        let doc = load()?;
        // Absence is not memoized so a newly created file is seen at once.
        if let Some(doc) = &doc {
            cache.set_default(key, doc.clone());
        }
        Ok(doc)
    }

    /// Serialize `value` and overwrite the base file.
    pub fn save<T: Serialize>(&self, descriptor: &ConfigDescriptor, value: &T) -> Result<()> {
        let doc = document::to_document(value)?;
        self.save_document(descriptor, &doc)
    }

    /// Overwrite the base file with a raw document.
    pub fn save_document(&self, descriptor: &ConfigDescriptor, doc: &Document) -> Result<()> {
        let path = descriptor.base_path();
        let bytes = document::serialize(doc, self.inner.options.indented)?;

        let lock = self.lock_for(&path);
        let _guard = lock.lock();
        fs::write_atomic(&path, &bytes)?;
        self.invalidate(descriptor);

        metrics::record_write("save");
        tracing::info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Set the value at `dot_path` in the base file.
    ///
    /// No-op when the base file does not exist. Fails without touching the
    /// file when an intermediate segment is missing or not an object.
    pub fn update_path<T: Serialize>(
        &self,
        descriptor: &ConfigDescriptor,
        dot_path: &str,
        value: &T,
    ) -> Result<()> {
        let path = descriptor.base_path();
        let value = document::to_document(value)?;

        let lock = self.lock_for(&path);
        let _guard = lock.lock();

        let Some(mut doc) = read_document(&path)? else {
            tracing::debug!(path = %path.display(), dot_path, "Update skipped, config file absent");
            return Ok(());
        };
        document::set_path(&mut doc, dot_path, value)?;
        let bytes = document::serialize(&doc, self.inner.options.indented)?;
        fs::write_atomic(&path, &bytes)?;
        self.invalidate(descriptor);

        metrics::record_write("update_path");
        tracing::info!(path = %path.display(), dot_path, "Config path updated");
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, doc: Document) -> Result<T> {
        document::decode(doc, self.inner.options.case_insensitive)
    }

    /// In-process lock guarding read-modify-write on one file.
    pub(crate) fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.inner.locks.lock_for(path)
    }

    pub(crate) fn path_locks(&self) -> &fs::PathLocks {
        &self.inner.locks
    }

    pub(crate) fn watches(&self) -> &WatchRegistry {
        &self.inner.watches
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}

pub(crate) fn invalidate_cached(cache: &DocumentCache, base: &Path) {
    cache.remove_where(|(path, _)| path == base);
}

fn read_document(path: &Path) -> Result<Option<Document>> {
    let Some(bytes) = fs::read_optional(path)? else {
        metrics::record_load("absent");
        return Ok(None);
    };
    match document::parse(&bytes) {
        Ok(doc) => {
            metrics::record_load("hit");
            Ok(Some(doc))
        }
        Err(e) => {
            metrics::record_load("error");
            tracing::warn!(path = %path.display(), error = %e, "Config file is malformed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct AppConfig {
        name: String,
        port: u16,
    }

    fn store_in(dir: &Path) -> ConfigStore {
        ConfigStore::new(StoreOptions {
            base_dir: dir.to_path_buf(),
            ..StoreOptions::default()
        })
    }

    #[test]
    fn test_load_missing_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let desc = store.descriptor("app.json");
        assert!(store.load::<AppConfig>(&desc).unwrap().is_none());
        assert!(!store.exists(&desc));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(StoreOptions {
            base_dir: dir.path().join("nested/Configs"),
            ..StoreOptions::default()
        });
        let desc = store.descriptor("app.json");
        let config = AppConfig { name: "svc".into(), port: 8080 };

        store.save(&desc, &config).unwrap();
        assert!(store.exists(&desc));
        assert_eq!(store.load::<AppConfig>(&desc).unwrap(), Some(config));
    }

    #[test]
    fn test_load_malformed_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let desc = store.descriptor("app.json");
        std::fs::write(desc.base_path(), "{ not json").unwrap();

        let err = store.load::<AppConfig>(&desc).unwrap_err();
        assert!(matches!(err, ConfigError::Format(_)));
    }

    #[test]
    fn test_load_wrong_shape_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let desc = store.descriptor("app.json");
        store.save_document(&desc, &json!({"name": 1})).unwrap();

        let err = store.load::<AppConfig>(&desc).unwrap_err();
        assert!(matches!(err, ConfigError::Decode(_)));
    }

    #[test]
    fn test_cached_loads_are_invalidated_by_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::with_cache(
            StoreOptions {
                base_dir: dir.path().to_path_buf(),
                ..StoreOptions::default()
            },
            DocumentCache::new(),
        );
        let desc = store.descriptor("app.json");
        store.save_document(&desc, &json!({"v": 1})).unwrap();
        assert_eq!(store.load_document(&desc).unwrap(), Some(json!({"v": 1})));

        // Edits behind the store's back are not seen until invalidated.
        std::fs::write(desc.base_path(), r#"{"v": 2}"#).unwrap();
        assert_eq!(store.load_document(&desc).unwrap(), Some(json!({"v": 1})));
        store.invalidate(&desc);
        assert_eq!(store.load_document(&desc).unwrap(), Some(json!({"v": 2})));

        store.update_path(&desc, "v", &3).unwrap();
        assert_eq!(store.load_document(&desc).unwrap(), Some(json!({"v": 3})));
    }

    #[test]
    fn test_update_path_on_missing_file_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let desc = store.descriptor("app.json");
        store.update_path(&desc, "port", &1).unwrap();
        assert!(!store.exists(&desc));
    }

    #[test]
    fn test_update_path_rewrites_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let desc = store.descriptor("app.json");
        store.save_document(&desc, &json!({"db": {"port": 1}})).unwrap();

        store.update_path(&desc, "db.port", &5433).unwrap();
        assert_eq!(store.load_document(&desc).unwrap(), Some(json!({"db": {"port": 5433}})));
    }
}
