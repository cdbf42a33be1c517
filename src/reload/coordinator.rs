//! Reload coordinator.
//!
//! # Responsibilities
//! - Compare the config file against the last snapshot, drop no-op notifications
//! - Run at most one load at a time
//! - Collapse changes that arrive mid-load into one trailing reload
//!
//! # Design Decisions
//! - The in-flight load is stored and polled by the supervisor loop; a
//!   pending retry restarts from `completion()`, never by recursion
//! - Loads are never cancelled; a retry waits for the current load
//! - Content is compared only with the most recent snapshot

use std::path::{Path, PathBuf};

use crate::config::{ConfigError, ConfigLoader, LoadFuture, LoadedConfig};
use crate::reload::state::ReloadState;

/// Immediate result of asking for a reload.
#[derive(Debug)]
pub enum ReloadStep {
    /// A load began. `first` is set when there was no earlier snapshot.
    Started { first: bool },
    /// Content matches the snapshot; nothing to do.
    Unchanged,
    /// A load is already in flight; a retry is now pending.
    Coalesced,
    /// The config file could not be read.
    ReadFailed(ConfigError),
}

/// Result of an in-flight load, once it settles.
#[derive(Debug)]
pub enum ReloadCompletion {
    /// The load succeeded and reflects the latest content.
    Loaded(LoadedConfig),
    /// The load failed, or the retry could not read the file.
    Failed(ConfigError),
    /// The content moved on while loading; the result was dropped and a
    /// fresh load is in flight.
    Superseded,
}

/// Turns change notifications into reload cycles.
pub struct ReloadCoordinator<L> {
    path: PathBuf,
    loader: L,
    state: ReloadState,
    snapshot: Option<String>,
    in_flight: Option<LoadFuture>,
}

impl<L: ConfigLoader> ReloadCoordinator<L> {
    pub fn new(path: impl Into<PathBuf>, loader: L) -> Self {
        Self {
            path: path.into(),
            loader,
            state: ReloadState::Idle,
            snapshot: None,
            in_flight: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> ReloadState {
        self.state
    }

    /// Last content a load was started for.
    pub fn snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// Initial reload, run regardless of any notification.
    pub fn start(&mut self) -> ReloadStep {
        if self.state.is_busy() {
            return self.notify_changed();
        }
        match self.read_source() {
            Ok(content) => {
                let first = self.snapshot.is_none();
                self.begin(content);
                ReloadStep::Started { first }
            }
            Err(e) => ReloadStep::ReadFailed(e),
        }
    }

    /// Handle one change notification.
    pub fn notify_changed(&mut self) -> ReloadStep {
        if self.state.is_busy() {
            self.state = self.state.coalesce();
            tracing::debug!(path = %self.path.display(), "Config changed during reload, retry pending");
            return ReloadStep::Coalesced;
        }
        self.reload_if_changed()
    }

    /// Wait for the in-flight load to settle. Pending forever when idle.
    ///
    /// Cancel safe: the load stays stored until it resolves.
    pub async fn completion(&mut self) -> ReloadCompletion {
        let result = match self.in_flight.as_mut() {
            Some(load) => load.await,
            None => return std::future::pending().await,
        };
        self.in_flight = None;
        self.finish(result)
    }

    fn finish(&mut self, result: Result<LoadedConfig, ConfigError>) -> ReloadCompletion {
        let (next, retry) = self.state.complete();
        self.state = next;

        if retry {
            match self.reload_if_changed() {
                ReloadStep::Started { .. } => {
                    tracing::debug!(path = %self.path.display(), "Discarding stale load, reloading latest config");
                    return ReloadCompletion::Superseded;
                }
                // Mid-save: the snapshot still matches the finished load, and the
                // save completing will notify again.
                ReloadStep::ReadFailed(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Config unreadable on retry, keeping finished load");
                }
                // The notifications were spurious: the finished load is current.
                ReloadStep::Unchanged | ReloadStep::Coalesced => {}
            }
        }

        match result {
            Ok(loaded) => ReloadCompletion::Loaded(loaded),
            Err(e) => ReloadCompletion::Failed(e),
        }
    }

    fn reload_if_changed(&mut self) -> ReloadStep {
        let content = match self.read_source() {
            Ok(content) => content,
            Err(e) => return ReloadStep::ReadFailed(e),
        };
        if self.snapshot.as_deref() == Some(content.as_str()) {
            tracing::trace!(path = %self.path.display(), "Config content unchanged");
            return ReloadStep::Unchanged;
        }
        let first = self.snapshot.is_none();
        self.begin(content);
        ReloadStep::Started { first }
    }

    fn begin(&mut self, content: String) {
        self.snapshot = Some(content);
        self.state = ReloadState::Reloading;
        self.in_flight = Some(self.loader.load(&self.path));
        tracing::info!(path = %self.path.display(), "Loading config");
    }

    fn read_source(&self) -> Result<String, ConfigError> {
        std::fs::read_to_string(&self.path).map_err(ConfigError::Io)
    }
}
