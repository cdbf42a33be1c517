//! Termination triggers.
//!
//! # Responsibilities
//! - Register signal handlers (SIGINT, SIGTERM, SIGHUP)
//! - Watch stdin for end of input when it is not a terminal
//! - Translate each into a `Trigger` for the supervisor loop
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every trigger task stops when shutdown begins
//! - SIGHUP exits like SIGTERM; config reloads come from the file watch

use tokio::io::AsyncReadExt;
use tokio::sync::{broadcast, mpsc};

use crate::error::WatchError;
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownReason};

/// A request to stop.
#[derive(Debug)]
pub enum Trigger {
    Signal(&'static str),
    InputClosed,
    /// A trigger could not be installed.
    Failed(WatchError),
}

impl From<Trigger> for ShutdownReason {
    fn from(trigger: Trigger) -> Self {
        match trigger {
            Trigger::Signal(name) => ShutdownReason::Signal(name),
            Trigger::InputClosed => ShutdownReason::InputClosed,
            Trigger::Failed(e) => ShutdownReason::Fatal(e),
        }
    }
}

/// Incoming termination triggers.
///
/// Holds its own sender, so `next` never observes a closed channel.
pub struct Triggers {
    tx: mpsc::UnboundedSender<Trigger>,
    rx: mpsc::UnboundedReceiver<Trigger>,
}

impl Triggers {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Sender for injecting triggers.
    pub fn sender(&self) -> mpsc::UnboundedSender<Trigger> {
        self.tx.clone()
    }

    /// Spawn the OS trigger tasks. `watch_stdin` adds the end-of-input trigger.
    pub fn install(&self, shutdown: &ShutdownCoordinator, watch_stdin: bool) {
        spawn_trigger(shutdown.subscribe(), self.sender(), ctrl_c());

        #[cfg(unix)]
        {
            use tokio::signal::unix::SignalKind;
            spawn_trigger(
                shutdown.subscribe(),
                self.sender(),
                unix_signal(SignalKind::terminate(), "SIGTERM"),
            );
            spawn_trigger(
                shutdown.subscribe(),
                self.sender(),
                unix_signal(SignalKind::hangup(), "SIGHUP"),
            );
        }

        if watch_stdin {
            spawn_trigger(shutdown.subscribe(), self.sender(), stdin_closed());
        }
        tracing::debug!(watch_stdin, "Termination triggers installed");
    }

    /// Next trigger. Cancel safe.
    pub async fn next(&mut self) -> Trigger {
        match self.rx.recv().await {
            Some(trigger) => trigger,
            None => std::future::pending().await,
        }
    }
}

impl Default for Triggers {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_trigger<F>(mut stop: broadcast::Receiver<()>, tx: mpsc::UnboundedSender<Trigger>, trigger: F)
where
    F: std::future::Future<Output = Trigger> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = stop.recv() => {}
            trigger = trigger => {
                let _ = tx.send(trigger);
            }
        }
    });
}

async fn ctrl_c() -> Trigger {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Trigger::Signal("SIGINT"),
        Err(e) => Trigger::Failed(WatchError::Signal(e)),
    }
}

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind, name: &'static str) -> Trigger {
    match tokio::signal::unix::signal(kind) {
        Ok(mut signal) => {
            signal.recv().await;
            Trigger::Signal(name)
        }
        Err(e) => Trigger::Failed(WatchError::Signal(e)),
    }
}

/// Resolves once stdin hits end of input. Read errors count as closed.
async fn stdin_closed() -> Trigger {
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 1024];
    loop {
        match stdin.read(&mut buf).await {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Stdin read failed");
                break;
            }
        }
    }
    Trigger::InputClosed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_trigger_is_delivered() {
        let mut triggers = Triggers::new();
        triggers.sender().send(Trigger::InputClosed).unwrap();
        assert!(matches!(triggers.next().await, Trigger::InputClosed));
    }

    #[tokio::test]
    async fn test_trigger_task_stops_on_shutdown() {
        let shutdown = ShutdownCoordinator::new();
        let triggers = Triggers::new();
        spawn_trigger(
            shutdown.subscribe(),
            triggers.sender(),
            std::future::pending::<Trigger>(),
        );
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.begin();
        for _ in 0..10 {
            if shutdown.receiver_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(shutdown.receiver_count(), 0);
    }

    #[test]
    fn test_failed_trigger_is_fatal() {
        let reason = ShutdownReason::from(Trigger::Failed(WatchError::SessionEnded));
        assert_eq!(reason.exit_code(), 1);
    }
}
