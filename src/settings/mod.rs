//! Settings of the hosting process itself.
//!
//! # Data Flow
//! ```text
//! layered-config.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → StoreOptions / cache TTL / watch list / logging
//! ```
//!
//! # Design Decisions
//! - Every section has defaults so an empty file is a valid file
//! - Validation separates syntactic (serde) from semantic checks
//! - Settings are read once at startup; the documents they point at are
//!   what gets hot-reloaded

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, SettingsError};
pub use schema::Settings;
