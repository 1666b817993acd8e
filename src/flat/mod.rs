//! Flat section/key-value (INI-style) documents.
//!
//! # Data Flow
//! ```text
//! text → document::FlatDocument::parse (lenient, never fails)
//!     → in-memory edits (set / remove_key / remove_section)
//!     → FlatDocument::serialize → text
//!
//! text → validate::validate (strict grammar, boolean verdict)
//!
//! FlatDocumentStore: path-based wrapper; every mutation is written
//! straight back to disk
//! ```
//!
//! # Design Decisions
//! - Sections and keys keep their file order for round-trip fidelity
//! - A repeated `[section]` header replaces the earlier section wholesale
//! - Merging is shallow: source keys overwrite target keys, nothing nests
//! - Typed accessors fall back to the caller's default instead of failing

pub mod document;
pub mod store;
pub mod validate;

pub use document::{FlatDocument, Section};
pub use store::FlatDocumentStore;
pub use validate::validate;
