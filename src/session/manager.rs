//! Active watch session ownership.
//!
//! # Responsibilities
//! - Hold at most one live session and its event stream
//! - Close the old session before starting its replacement
//! - Hand the active session's events to the relay in order

use crate::config::{BuildConfig, WatchSettings};
use crate::engine::{BuildEngine, BuildEvent, EventStream, WatchSession};
use crate::error::WatchError;
use crate::observability::metrics;
use crate::relay::DiagnosticBuffer;

struct ActiveSession<S> {
    session: S,
    events: EventStream,
}

/// Owns the single active build-watch session.
pub struct WatchSessionManager<E: BuildEngine> {
    engine: E,
    diagnostics: DiagnosticBuffer,
    active: Option<ActiveSession<E::Session>>,
    started: u64,
}

impl<E: BuildEngine> WatchSessionManager<E> {
    pub fn new(engine: E, diagnostics: DiagnosticBuffer) -> Self {
        Self {
            engine,
            diagnostics,
            active: None,
            started: 0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Number of sessions started so far.
    pub fn sessions_started(&self) -> u64 {
        self.started
    }

    /// Close the active session, if any, then start a new one for `builds`.
    ///
    /// Closing does not wait for the old session to wind down; its event
    /// stream is dropped, so nothing it emits afterwards reaches the relay.
    pub fn replace(&mut self, builds: &[BuildConfig], settings: &WatchSettings) -> Result<(), WatchError> {
        self.close_active();

        let (session, events) = self.engine.start_watch(builds, settings, &self.diagnostics)?;
        self.active = Some(ActiveSession { session, events });
        self.started += 1;
        metrics::record_session_started();

        tracing::info!(session = self.started, builds = builds.len(), "Watch session active");
        Ok(())
    }

    /// Close the active session. No-op when none is active.
    pub fn close_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.session.close();
            tracing::debug!(session = self.started, "Watch session closed");
        }
    }

    /// Next event of the active session. Pending forever while none is active.
    ///
    /// Cancel safe.
    pub async fn next_event(&mut self) -> Result<BuildEvent, WatchError> {
        let Some(active) = self.active.as_mut() else {
            return std::future::pending().await;
        };
        match active.events.recv().await {
            Some(item) => item,
            None => Err(WatchError::SessionEnded),
        }
    }
}
