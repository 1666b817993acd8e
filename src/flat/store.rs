//! Path-based access to flat documents on disk.

use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::flat::{validate, FlatDocument};
use crate::observability::metrics;
use crate::store::fs::{self, PathLocks};

/// Reads and writes flat documents, persisting every mutation immediately.
#[derive(Default)]
pub struct FlatDocumentStore {
    locks: PathLocks,
}

impl FlatDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`; a missing file is an empty document.
    pub fn load(&self, path: &Path) -> Result<FlatDocument> {
        match read_text(path)? {
            Some(text) => Ok(FlatDocument::parse(&text)),
            None => Ok(FlatDocument::new()),
        }
    }

    /// Overwrite `path` with `doc`.
    pub fn save(&self, path: &Path, doc: &FlatDocument) -> Result<()> {
        let lock = self.locks.lock_for(path);
        let _guard = lock.lock();
        self.write(path, doc)
    }

    pub fn get_value(&self, path: &Path, section: &str, key: &str) -> Result<Option<String>> {
        Ok(self.load(path)?.get(section, key).map(str::to_owned))
    }

    /// Set `key` in `section`, creating the section (and file) if needed.
    pub fn set_value(&self, path: &Path, section: &str, key: &str, value: &str) -> Result<()> {
        self.modify(path, |doc| {
            doc.set(section, key, value);
            true
        })
        .map(|_| ())
    }

    /// Returns whether the key existed.
    pub fn delete_key(&self, path: &Path, section: &str, key: &str) -> Result<bool> {
        self.modify(path, |doc| doc.remove_key(section, key))
    }

    /// Returns whether the section existed.
    pub fn delete_section(&self, path: &Path, section: &str) -> Result<bool> {
        self.modify(path, |doc| doc.remove_section(section))
    }

    pub fn sections(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self.load(path)?.section_names().map(str::to_owned).collect())
    }

    pub fn keys(&self, path: &Path, section: &str) -> Result<Vec<String>> {
        Ok(self
            .load(path)?
            .section(section)
            .map(|s| s.keys().map(str::to_owned).collect())
            .unwrap_or_default())
    }

    /// Integer value, or `default` if missing, unparsable or unreadable.
    pub fn get_int(&self, path: &Path, section: &str, key: &str, default: i64) -> i64 {
        self.load_or_empty(path).get_int(section, key, default)
    }

    pub fn get_double(&self, path: &Path, section: &str, key: &str, default: f64) -> f64 {
        self.load_or_empty(path).get_double(section, key, default)
    }

    pub fn get_bool(&self, path: &Path, section: &str, key: &str, default: bool) -> bool {
        self.load_or_empty(path).get_bool(section, key, default)
    }

    /// Overlay every key of `source` onto `target` and persist `target`.
    pub fn merge(&self, source: &Path, target: &Path) -> Result<()> {
        let Some(text) = read_text(source)? else {
            return Err(ConfigError::NotFound(source.to_path_buf()));
        };
        let overlay = FlatDocument::parse(&text);
        self.modify(target, |doc| {
            doc.merge_from(&overlay);
            true
        })?;
        tracing::info!(source = %source.display(), target = %target.display(), "Flat documents merged");
        Ok(())
    }

    /// Strict validation of the file at `path`; `false` on any I/O failure.
    pub fn validate(&self, path: &Path) -> bool {
        match std::fs::read_to_string(path) {
            Ok(text) => validate(&text),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Flat document unreadable");
                false
            }
        }
    }

    fn modify<F>(&self, path: &Path, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut FlatDocument) -> bool,
    {
        let lock = self.locks.lock_for(path);
        let _guard = lock.lock();

        let mut doc = self.load(path)?;
        let changed = edit(&mut doc);
        if changed {
            self.write(path, &doc)?;
        }
        Ok(changed)
    }

    fn write(&self, path: &Path, doc: &FlatDocument) -> Result<()> {
        fs::write_atomic(path, doc.serialize().as_bytes())?;
        metrics::record_write("flat");
        tracing::debug!(path = %path.display(), "Flat document written");
        Ok(())
    }

    fn load_or_empty(&self, path: &Path) -> FlatDocument {
        self.load(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Flat document unreadable, using defaults");
            FlatDocument::new()
        })
    }
}

fn read_text(path: &Path) -> Result<Option<String>> {
    fs::read_optional(path)?
        .map(|bytes| {
            String::from_utf8(bytes)
                .map_err(|e| ConfigError::Format(format!("{}: {}", path.display(), e)))
        })
        .transpose()
}
