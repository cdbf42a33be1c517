//! Top-level event loop.
//!
//! # Responsibilities
//! - Own every watch component and mutate them from one place
//! - Route config changes, load completions and build events
//! - Route every termination trigger into one cleanup
//!
//! # Design Decisions
//! - Single control thread: one `select!` loop, no shared mutable state
//! - Triggers are polled first so a shutdown is never starved by events
//! - Any `WatchError` reaching the loop is fatal

use crate::config::{ConfigChangeDetector, ConfigLoader, LoadedConfig};
use crate::engine::{BuildEngine, BuildEvent};
use crate::error::WatchError;
use crate::lifecycle::shutdown::{ShutdownCoordinator, ShutdownReason};
use crate::lifecycle::signals::{Trigger, Triggers};
use crate::observability::metrics::{self, outcome};
use crate::relay::{BuildEventRelay, DiagnosticBuffer, RelayOptions, StatusSink};
use crate::reload::{ReloadCompletion, ReloadCoordinator, ReloadStep};
use crate::session::WatchSessionManager;

enum Wake {
    Trigger(Trigger),
    ConfigChanged(Result<(), WatchError>),
    ReloadCompleted(ReloadCompletion),
    Build(Result<BuildEvent, WatchError>),
}

/// Owns the watch components and drives them until shutdown.
pub struct Supervisor<L, E: BuildEngine, S> {
    reload: Option<ReloadCoordinator<L>>,
    detector: Option<ConfigChangeDetector>,
    sessions: WatchSessionManager<E>,
    relay: BuildEventRelay<S>,
    diagnostics: DiagnosticBuffer,
    shutdown: ShutdownCoordinator,
}

impl<L, E, S> Supervisor<L, E, S>
where
    L: ConfigLoader,
    E: BuildEngine,
    S: StatusSink,
{
    pub fn new(engine: E, sink: S, options: RelayOptions) -> Self {
        let diagnostics = DiagnosticBuffer::new();
        Self {
            reload: None,
            detector: None,
            sessions: WatchSessionManager::new(engine, diagnostics.clone()),
            relay: BuildEventRelay::new(sink, diagnostics.clone(), options),
            diagnostics,
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Reload builds from a config file. `detector` feeds change notifications.
    pub fn with_config(mut self, reload: ReloadCoordinator<L>, detector: Option<ConfigChangeDetector>) -> Self {
        self.reload = Some(reload);
        self.detector = detector;
        self
    }

    pub fn sessions(&self) -> &WatchSessionManager<E> {
        &self.sessions
    }

    pub fn reload(&self) -> Option<&ReloadCoordinator<L>> {
        self.reload.as_ref()
    }

    pub fn shutdown_coordinator(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    /// Kick off the initial config load.
    pub fn start_config(&mut self) {
        if let Some(reload) = self.reload.as_mut() {
            let step = reload.start();
            self.on_step(step);
        }
    }

    /// Start a session directly from builds that need no config file.
    pub fn start_builds(&mut self, loaded: LoadedConfig) -> Result<(), WatchError> {
        self.apply(loaded)
    }

    /// A `changed` notification arrived from the config watch.
    pub fn on_config_changed(&mut self) {
        if let Some(reload) = self.reload.as_mut() {
            let step = reload.notify_changed();
            self.on_step(step);
        }
    }

    /// Wait for the in-flight config load. Pending forever when none is running.
    pub async fn next_completion(&mut self) -> ReloadCompletion {
        next_completion(&mut self.reload).await
    }

    /// Act on a settled config load.
    pub fn on_reload_completed(&mut self, completion: ReloadCompletion) -> Result<(), WatchError> {
        match completion {
            ReloadCompletion::Loaded(loaded) => {
                self.apply(loaded)?;
                metrics::record_reload(outcome::APPLIED);
            }
            ReloadCompletion::Failed(e) => {
                tracing::warn!(error = %e, "Config reload failed, keeping current session");
                self.relay.report(&e, false);
                metrics::record_reload(outcome::FAILED);
            }
            ReloadCompletion::Superseded => {
                self.relay.reloading();
                metrics::record_reload(outcome::SUPERSEDED);
            }
        }
        Ok(())
    }

    pub fn on_build_event(&mut self, event: BuildEvent) {
        self.relay.handle(event);
    }

    /// Run cleanup once. Returns the exit status for the first caller and
    /// `None` for every later one.
    pub fn shutdown(&mut self, reason: ShutdownReason) -> Option<i32> {
        if !self.shutdown.begin() {
            tracing::debug!(%reason, "Shutdown already in progress");
            return None;
        }
        tracing::info!(%reason, "Shutting down");

        if let ShutdownReason::Fatal(e) = &reason {
            self.relay.flush();
            self.relay.report(e, true);
        }

        self.sessions.close_active();
        if let Some(detector) = self.detector.take() {
            detector.close();
        }
        Some(reason.exit_code())
    }

    /// Drive everything until a trigger or a fatal error stops the loop.
    /// Returns the process exit status.
    pub async fn run(mut self, mut triggers: Triggers) -> i32 {
        loop {
            let wake = tokio::select! {
                biased;
                trigger = triggers.next() => Wake::Trigger(trigger),
                changed = next_change(&mut self.detector) => Wake::ConfigChanged(changed),
                completion = next_completion(&mut self.reload) => Wake::ReloadCompleted(completion),
                event = self.sessions.next_event() => Wake::Build(event),
            };

            let fatal = match wake {
                Wake::Trigger(trigger) => Some(ShutdownReason::from(trigger)),
                Wake::ConfigChanged(Ok(())) => {
                    self.on_config_changed();
                    None
                }
                Wake::ReloadCompleted(completion) => self.on_reload_completed(completion).err().map(ShutdownReason::Fatal),
                Wake::Build(Ok(event)) => {
                    self.on_build_event(event);
                    None
                }
                Wake::ConfigChanged(Err(e)) | Wake::Build(Err(e)) => Some(ShutdownReason::Fatal(e)),
            };

            if let Some(reason) = fatal {
                if let Some(code) = self.shutdown(reason) {
                    return code;
                }
            }
        }
    }

    fn on_step(&mut self, step: ReloadStep) {
        match step {
            ReloadStep::Started { first } => {
                if !first {
                    self.relay.reloading();
                }
            }
            ReloadStep::Unchanged | ReloadStep::Coalesced => {}
            ReloadStep::ReadFailed(e) => {
                tracing::warn!(error = %e, "Config file could not be read");
                self.relay.report(&e, false);
                metrics::record_reload(outcome::FAILED);
            }
        }
    }

    fn apply(&mut self, loaded: LoadedConfig) -> Result<(), WatchError> {
        self.diagnostics.extend(loaded.warnings);
        self.relay.set_clear_screen(loaded.settings.clear_screen);
        self.sessions.replace(&loaded.builds, &loaded.settings)
    }
}

async fn next_change(detector: &mut Option<ConfigChangeDetector>) -> Result<(), WatchError> {
    match detector {
        Some(detector) => detector.changed().await,
        None => std::future::pending().await,
    }
}

async fn next_completion<L: ConfigLoader>(reload: &mut Option<ReloadCoordinator<L>>) -> ReloadCompletion {
    match reload {
        Some(reload) => reload.completion().await,
        None => std::future::pending().await,
    }
}
