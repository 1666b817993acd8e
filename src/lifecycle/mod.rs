//! Lifecycle management for the configuration agent.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → ConfigStore (+ document cache) → initial loads → watchers
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Force a reload of every watched document
//!
//! Reporters (shutdown.rs):
//!     Reloadable generation change → log line, until Agent::stop
//!     SIGTERM/SIGINT → Agent::stop → reporters exit → watchers removed
//! ```
//!
//! # Design Decisions
//! - Fail fast: a malformed document at startup is fatal
//! - After startup a bad edit only logs; the last good snapshot stays live

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{SignalEvent, SignalListener};
pub use startup::Agent;
