//! Shutdown coordination for the watcher.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use crate::error::WatchError;

/// Why the process is stopping.
#[derive(Debug)]
pub enum ShutdownReason {
    /// A termination signal arrived (named for logging).
    Signal(&'static str),
    /// Stdin reached end of input.
    InputClosed,
    /// A watch primitive failed.
    Fatal(WatchError),
}

impl ShutdownReason {
    /// Process exit status for this reason.
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Fatal(_) => 1,
            ShutdownReason::Signal(_) | ShutdownReason::InputClosed => 0,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "received {}", name),
            ShutdownReason::InputClosed => write!(f, "stdin closed"),
            ShutdownReason::Fatal(e) => write!(f, "fatal error: {}", e),
        }
    }
}

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that trigger tasks subscribe to, and a
/// run-once guard so that only the first trigger performs cleanup.
pub struct ShutdownCoordinator {
    tx: broadcast::Sender<()>,
    started: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            started: AtomicBool::new(false),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Claim the shutdown. Returns `true` exactly once; that caller owns
    /// cleanup. Subscribers are told to stop.
    pub fn begin(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _ = self.tx.send(());
        true
    }

    pub fn is_shutting_down(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Number of trigger tasks still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
