//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events on stderr)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Terminal (logs, when raised with -v or RUST_LOG)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Logs never replace status lines; they are for diagnosing the watcher itself
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
