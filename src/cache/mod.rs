//! Process-local expiring key-value cache.
//!
//! # Data Flow
//! ```text
//! caller → set(key, value, ttl) → entry { value, expires_at = now + ttl }
//! caller → get(key)
//!     → live entry: clone value out
//!     → expired entry: removed on the spot, reported as absent
//! ```
//!
//! # Design Decisions
//! - Expiry is checked at read time; there is no background sweeper
//! - Expired entries that are never read again stay resident until
//!   `purge_expired` or `clear` is called
//! - The cache is an explicitly constructed value, cloned (cheaply) into
//!   whoever needs it rather than a global singleton

pub mod expiring;

pub use expiring::{ExpiringCache, DEFAULT_TTL};
