//! Structured (JSON-compatible) configuration documents.
//!
//! # Data Flow
//! ```text
//! bytes → codec::parse → Document (object/array/scalar tree)
//!     → merge::merge(base, overlay)   environment overlays
//!     → path::set_path                targeted updates
//!     → codec::decode<T>              typed values for callers
//! Document → codec::serialize → bytes (stable key order)
//! ```
//!
//! # Design Decisions
//! - The tree is `serde_json::Value`; its map is ordered by key, so the same
//!   document always serializes to the same bytes
//! - Deep merge recurses only through objects; everything else is replaced
//! - Path updates never create intermediate objects

pub mod codec;
pub mod merge;
pub mod path;

pub use codec::{decode, parse, serialize, to_document};
pub use merge::merge;
pub use path::{get_path, set_path};

/// A structured document node.
pub type Document = serde_json::Value;
