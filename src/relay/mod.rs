//! Build event relay subsystem.
//!
//! # Data Flow
//! ```text
//! session EventStream
//!     → event_relay.rs (flush points, silent / interactive rules)
//!     → Status values
//!     → status.rs sink (terminal or NDJSON)
//!
//! loader / builds → diagnostics.rs buffer → drained at flush points
//! ```
//!
//! # Design Decisions
//! - A flush always precedes the status line of the flushing event
//! - Draining empties the buffer, so a warning is never printed twice
//! - Errors are never silenced

pub mod diagnostics;
pub mod event_relay;
pub mod format;
pub mod status;

pub use diagnostics::{Diagnostic, DiagnosticBuffer};
pub use event_relay::{BuildEventRelay, RelayOptions};
pub use status::{JsonSink, Status, StatusSink, TerminalSink};
