//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Supervisor (supervisor.rs):
//!     Initial load → Session started → select! over triggers, config
//!     changes, load completions and build events
//!
//! Shutdown (shutdown.rs):
//!     First trigger wins → Stop trigger tasks → Close session → Close config watch → Exit
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGHUP, stdin EOF → Trigger
//! ```
//!
//! # Design Decisions
//! - Every termination path converges on one run-once cleanup
//! - Fatal errors exit 1, everything else exits 0

pub mod shutdown;
pub mod signals;
pub mod supervisor;

pub use shutdown::{ShutdownCoordinator, ShutdownReason};
pub use signals::{Trigger, Triggers};
pub use supervisor::Supervisor;
