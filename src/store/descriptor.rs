//! Identification of a logical configuration file.

use std::path::{Path, PathBuf};

/// A logical config: a base file plus an optional environment overlay.
///
/// `app.json` with environment `prod` resolves to `app.json` and
/// `app.prod.json` in the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigDescriptor {
    pub file_name: String,
    pub directory: PathBuf,
    pub environment: Option<String>,
}

impl ConfigDescriptor {
    pub fn new(file_name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            directory: directory.into(),
            environment: None,
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Path of the base file.
    pub fn base_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Path of the environment overlay, if an environment is set.
    pub fn environment_path(&self) -> Option<PathBuf> {
        let environment = self.environment.as_deref().filter(|e| !e.is_empty())?;
        let (stem, ext) = split_name(&self.file_name);
        Some(self.directory.join(format!("{stem}.{environment}{ext}")))
    }

    /// Absolute form of the base path, used as the watch-table key.
    pub fn resolved_path(&self) -> PathBuf {
        let base = self.base_path();
        std::path::absolute(&base).unwrap_or(base)
    }

    /// File name stem and extension (with its leading dot, or empty).
    pub(crate) fn name_parts(&self) -> (&str, &str) {
        split_name(&self.file_name)
    }

    pub(crate) fn parent_dir(&self) -> &Path {
        &self.directory
    }
}

fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}
