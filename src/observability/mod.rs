//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Whatever metrics recorder the host process installs
//! ```
//!
//! # Design Decisions
//! - The library never installs a metrics recorder; without one every
//!   update is a no-op
//! - Structured fields (path, key, op) instead of formatted messages

pub mod logging;
pub mod metrics;
