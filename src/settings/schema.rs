//! Settings schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root settings for the configuration agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Where config documents live and how they are written.
    pub store: StoreSettings,

    /// Expiring cache defaults.
    pub cache: CacheSettings,

    /// Hot-reload settings.
    pub watch: WatchSettings,

    /// Logging settings.
    pub observability: ObservabilitySettings,
}

/// Document store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Base directory for config files.
    pub base_dir: PathBuf,

    /// Backup subdirectory name, created next to each config file.
    pub backup_dir_name: String,

    /// Match document keys to field names case-insensitively.
    pub case_insensitive: bool,

    /// Indent documents on write.
    pub indented: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("Configs"),
            backup_dir_name: "Backups".to_string(),
            case_insensitive: true,
            indented: true,
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Default entry TTL in seconds.
    pub default_ttl_secs: u64,
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: 30 * 60,
        }
    }
}

/// Hot-reload settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Install file watchers for the listed descriptors.
    pub enabled: bool,

    /// Quiet period before a burst of change events triggers a reload.
    pub debounce_ms: u64,

    /// Config documents to load and keep current.
    pub descriptors: Vec<DescriptorSettings>,
}

impl WatchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 250,
            descriptors: Vec::new(),
        }
    }
}

/// A watched config document, relative to `store.base_dir`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DescriptorSettings {
    /// File name, e.g. `app.json`.
    pub file_name: String,

    /// Optional environment overlay, e.g. `prod` for `app.prod.json`.
    #[serde(default)]
    pub environment: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log format (pretty, json).
    pub log_format: LogFormat,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
