//! Error taxonomy shared by the document, store and flat-format subsystems.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by configuration operations.
///
/// Cache operations never produce one of these; absence is a normal `None`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed structured or flat document.
    #[error("format error: {0}")]
    Format(String),

    /// Well-formed document whose shape does not match the target type.
    #[error("decode error: {0}")]
    Decode(String),

    /// Dot-path traversal hit a missing or non-object intermediate segment.
    #[error("path '{path}' not found (segment '{segment}' is missing or not an object)")]
    PathNotFound { path: String, segment: String },

    /// Referenced backup or file is absent.
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Underlying read/write/copy failure.
    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::Format(_) => "format",
            ConfigError::Decode(_) => "decode",
            ConfigError::PathNotFound { .. } => "path_not_found",
            ConfigError::NotFound(_) => "not_found",
            ConfigError::Io { .. } => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
