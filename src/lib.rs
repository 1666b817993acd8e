//! Layered configuration and caching core.
//!
//! - [`cache`]: process-local expiring key-value cache
//! - [`document`]: structured documents, deep merge and dot-path updates
//! - [`store`]: base/environment config files with backups and hot reload
//! - [`flat`]: INI-style section/key-value documents

pub mod cache;
pub mod document;
pub mod error;
pub mod flat;
pub mod lifecycle;
pub mod observability;
pub mod settings;
pub mod store;

pub use cache::ExpiringCache;
pub use document::Document;
pub use error::{ConfigError, Result};
pub use flat::{FlatDocument, FlatDocumentStore};
pub use settings::Settings;
pub use store::{ConfigDescriptor, ConfigStore, DocumentCache, Reloadable, StoreOptions};
