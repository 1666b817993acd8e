//! Settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (TTL > 0)
//! - Reject descriptor names that escape the base directory
//! - Detect duplicate descriptors (one watcher per base file)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Settings → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use crate::settings::schema::Settings;

/// A single semantic problem in the settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("store.base_dir must not be empty")]
    EmptyBaseDir,

    #[error("store.backup_dir_name '{0}' must be a plain directory name")]
    InvalidBackupDirName(String),

    #[error("cache.default_ttl_secs must be greater than zero")]
    ZeroTtl,

    #[error("watch descriptor '{0}' must be a plain file name")]
    InvalidFileName(String),

    #[error("watch descriptor '{0}' is listed more than once")]
    DuplicateDescriptor(String),
}

pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.store.base_dir.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyBaseDir);
    }

    if !is_plain_name(&settings.store.backup_dir_name) {
        errors.push(ValidationError::InvalidBackupDirName(
            settings.store.backup_dir_name.clone(),
        ));
    }

    if settings.cache.default_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTtl);
    }

    let mut seen = HashSet::new();
    for descriptor in &settings.watch.descriptors {
        if !is_plain_name(&descriptor.file_name) {
            errors.push(ValidationError::InvalidFileName(descriptor.file_name.clone()));
        }
        if !seen.insert(descriptor.file_name.as_str()) {
            errors.push(ValidationError::DuplicateDescriptor(descriptor.file_name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
