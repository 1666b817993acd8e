//! Timestamped backups and restore.
//!
//! Backups of `Configs/app.json` live in `Configs/Backups/` as
//! `app.{yyyyMMddHHmmss}.json`. Two backups in the same second overwrite
//! each other.

use chrono::Local;
use std::ffi::OsStr;
use std::fs as stdfs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::observability::metrics;
use crate::store::{fs, ConfigDescriptor, ConfigStore};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_LEN: usize = 14;

impl ConfigStore {
    /// Directory holding backups for `descriptor`.
    pub fn backup_dir(&self, descriptor: &ConfigDescriptor) -> PathBuf {
        descriptor
            .parent_dir()
            .join(&self.options().backup_dir_name)
    }

    /// Copy the current base file into the backup directory.
    ///
    /// Returns the backup path, or `None` when there is no base file.
    pub fn backup(&self, descriptor: &ConfigDescriptor) -> Result<Option<PathBuf>> {
        let lock = self.lock_for(&descriptor.base_path());
        let _guard = lock.lock();
        self.backup_unlocked(descriptor)
    }

    /// Replace the base file with the named backup.
    ///
    /// The current base file is backed up first, so a restore can itself be
    /// undone.
    pub fn restore(&self, descriptor: &ConfigDescriptor, backup_file_name: &str) -> Result<()> {
        let backup_path = self.backup_dir(descriptor).join(backup_file_name);
        if Path::new(backup_file_name).file_name() != Some(OsStr::new(backup_file_name)) {
            return Err(ConfigError::NotFound(backup_path));
        }

        let base_path = descriptor.base_path();
        let lock = self.lock_for(&base_path);
        let _guard = lock.lock();

        // Read before backing up: a backup taken in the same second would
        // overwrite the file being restored.
        let bytes = match stdfs::read(&backup_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(backup_path));
            }
            Err(e) => return Err(ConfigError::io(&backup_path, e)),
        };

        self.backup_unlocked(descriptor)?;
        fs::write_atomic(&base_path, &bytes)?;
        self.invalidate(descriptor);

        metrics::record_write("restore");
        tracing::info!(
            path = %base_path.display(),
            backup = %backup_path.display(),
            "Config restored from backup"
        );
        Ok(())
    }

    /// Backups of `descriptor`, newest first.
    pub fn list_backups(&self, descriptor: &ConfigDescriptor) -> Result<Vec<PathBuf>> {
        let dir = self.backup_dir(descriptor);
        let entries = match stdfs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConfigError::io(&dir, e)),
        };

        let (stem, ext) = descriptor.name_parts();
        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigError::io(&dir, e))?;
            let name = entry.file_name();
            if is_backup_name(&name.to_string_lossy(), stem, ext) {
                backups.push(entry.path());
            }
        }
        backups.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(backups)
    }

    fn backup_unlocked(&self, descriptor: &ConfigDescriptor) -> Result<Option<PathBuf>> {
        let base_path = descriptor.base_path();
        let Some(bytes) = fs::read_optional(&base_path)? else {
            tracing::debug!(path = %base_path.display(), "Backup skipped, config file absent");
            return Ok(None);
        };

        let (stem, ext) = descriptor.name_parts();
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        let backup_path = self
            .backup_dir(descriptor)
            .join(format!("{stem}.{timestamp}{ext}"));
        fs::write_atomic(&backup_path, &bytes)?;

        metrics::record_backup();
        tracing::info!(
            path = %base_path.display(),
            backup = %backup_path.display(),
            "Config backed up"
        );
        Ok(Some(backup_path))
    }
}

fn is_backup_name(name: &str, stem: &str, ext: &str) -> bool {
    name.strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(ext))
        .is_some_and(|ts| ts.len() == TIMESTAMP_LEN && ts.bytes().all(|b| b.is_ascii_digit()))
}
