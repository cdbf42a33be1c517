//! Build engine seam.
//!
//! # Data Flow
//! ```text
//! Vec<BuildConfig>
//!     → BuildEngine::start_watch
//!     → (WatchSession handle, EventStream)
//!     → session manager stores both; relay consumes the stream
//! ```
//!
//! # Design Decisions
//! - The engine detects source changes; the coordinator never does
//! - Events travel over an unbounded channel so producers never block
//! - A stream item of `Err` means the session primitive itself failed

pub mod command;
pub mod event;

use tokio::sync::mpsc;

use crate::config::{BuildConfig, WatchSettings};
use crate::error::WatchError;
use crate::relay::DiagnosticBuffer;

pub use command::CommandEngine;
pub use event::{BuildError, BuildEvent, Timing};

/// Ordered events of one session.
pub type EventStream = mpsc::UnboundedReceiver<Result<BuildEvent, WatchError>>;

/// Handle to a running watch session.
pub trait WatchSession {
    /// Ask the session to stop. Returns immediately; the session may still
    /// be winding down.
    fn close(&mut self);
}

/// Starts watch sessions for a set of builds.
pub trait BuildEngine {
    type Session: WatchSession;

    /// Start watching `builds`. Warnings produced by builds go to `diagnostics`.
    fn start_watch(
        &self,
        builds: &[BuildConfig],
        settings: &WatchSettings,
        diagnostics: &DiagnosticBuffer,
    ) -> Result<(Self::Session, EventStream), WatchError>;
}
