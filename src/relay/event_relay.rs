//! Projection of build events onto status output.

use std::error::Error as StdError;
use std::path::PathBuf;

use crate::engine::BuildEvent;
use crate::error::error_chain;
use crate::observability::metrics;
use crate::relay::diagnostics::DiagnosticBuffer;
use crate::relay::format::{join_paths, timestamp};
use crate::relay::status::{Status, StatusSink, TimingRow};

/// How status output is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOptions {
    /// Suppress status lines. Errors and warnings still print.
    pub silent: bool,
    /// Output goes to a terminal a person is watching.
    pub interactive: bool,
    /// Clear the screen at the start of each cycle (interactive only).
    pub clear_screen: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            silent: false,
            interactive: false,
            clear_screen: true,
        }
    }
}

/// Turns the active session's events into ordered status output.
///
/// Buffered diagnostics are flushed before the status line of any event
/// that is a flush point (`Error`, `BundleEnd`), and each diagnostic is
/// shown exactly once.
pub struct BuildEventRelay<S> {
    sink: S,
    diagnostics: DiagnosticBuffer,
    options: RelayOptions,
    base: PathBuf,
    banner_shown: bool,
}

impl<S: StatusSink> BuildEventRelay<S> {
    pub fn new(sink: S, diagnostics: DiagnosticBuffer, options: RelayOptions) -> Self {
        Self {
            sink,
            diagnostics,
            options,
            base: std::env::current_dir().unwrap_or_default(),
            banner_shown: false,
        }
    }

    /// Directory output paths are shown relative to.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    pub fn set_clear_screen(&mut self, clear_screen: bool) {
        self.options.clear_screen = clear_screen;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn handle(&mut self, event: BuildEvent) {
        tracing::trace!(code = event.code(), "Build event");

        match event {
            BuildEvent::Error { error } => {
                self.flush();
                metrics::record_build_error();
                self.report(&error, false);
            }
            BuildEvent::Start => {
                if !self.options.silent {
                    self.reset_screen();
                }
            }
            BuildEvent::BundleStart { input, output } => {
                if !self.options.silent {
                    let status = Status::Building {
                        input: input.joined(),
                        output: join_paths(&output, &self.base),
                    };
                    self.sink.emit(&status);
                }
            }
            BuildEvent::BundleEnd {
                output,
                duration,
                timings,
                ..
            } => {
                self.flush();
                metrics::record_build(duration);
                if !self.options.silent {
                    let status = Status::Built {
                        output: join_paths(&output, &self.base),
                        duration_ms: duration.as_millis() as u64,
                    };
                    self.sink.emit(&status);
                }
                if let Some(timings) = timings {
                    let rows = timings
                        .into_iter()
                        .map(|t| TimingRow {
                            label: t.label,
                            elapsed_ms: t.elapsed.as_millis() as u64,
                        })
                        .collect();
                    self.sink.emit(&Status::Timings { rows });
                }
            }
            BuildEvent::End => {
                if !self.options.silent && self.options.interactive {
                    self.sink.emit(&Status::Waiting { at: timestamp() });
                }
            }
        }
    }

    /// Print and clear buffered diagnostics.
    pub fn flush(&mut self) {
        for diagnostic in self.diagnostics.drain() {
            self.sink.emit(&Status::Warning {
                source: diagnostic.source,
                message: diagnostic.message,
            });
        }
    }

    /// Announce that a changed config is being loaded.
    pub fn reloading(&mut self) {
        if !self.options.silent {
            self.sink.emit(&Status::Reloading);
        }
    }

    /// Report an error. Never silenced.
    pub fn report(&mut self, error: &dyn StdError, fatal: bool) {
        self.sink.emit(&Status::Error {
            message: error_chain(error),
            fatal,
        });
    }

    fn reset_screen(&mut self) {
        let banner = Status::Starting {
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        if self.options.interactive && self.options.clear_screen {
            self.sink.clear_screen();
            self.sink.emit(&banner);
        } else if !self.banner_shown {
            self.sink.emit(&banner);
        }
        self.banner_shown = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputSpec;
    use crate::engine::{BuildError, Timing};
    use crate::relay::Diagnostic;
    use std::time::Duration;

    fn relay(options: RelayOptions) -> (BuildEventRelay<Vec<Status>>, DiagnosticBuffer) {
        let diagnostics = DiagnosticBuffer::new();
        let relay = BuildEventRelay::new(Vec::new(), diagnostics.clone(), options).with_base("/work");
        (relay, diagnostics)
    }

    fn bundle_end(timings: Option<Vec<Timing>>) -> BuildEvent {
        BuildEvent::BundleEnd {
            input: InputSpec::from("src/a.js"),
            output: vec![PathBuf::from("/work/dist/a.js")],
            duration: Duration::from_millis(120),
            timings,
        }
    }

    fn failure() -> BuildEvent {
        BuildEvent::Error {
            error: BuildError::CommandFailed {
                name: "app".into(),
                code: Some(1),
                output: String::new(),
            },
        }
    }

    #[test]
    fn test_flush_precedes_built_line() {
        let (mut relay, diagnostics) = relay(RelayOptions::default());
        diagnostics.push(Diagnostic::new("app", "unused variable"));

        relay.handle(bundle_end(None));
        relay.handle(bundle_end(None));

        let built = Status::Built {
            output: "dist/a.js".into(),
            duration_ms: 120,
        };
        assert_eq!(
            relay.sink(),
            &vec![
                Status::Warning {
                    source: "app".into(),
                    message: "unused variable".into(),
                },
                built.clone(),
                built,
            ]
        );
    }

    #[test]
    fn test_error_flushes_first() {
        let (mut relay, diagnostics) = relay(RelayOptions::default());
        diagnostics.push(Diagnostic::new("config", "unknown key"));
        relay.handle(failure());

        let sink = relay.sink();
        assert!(matches!(sink[0], Status::Warning { .. }));
        assert_eq!(
            sink[1],
            Status::Error {
                message: "build 'app' failed with exit code 1".into(),
                fatal: false,
            }
        );
    }

    #[test]
    fn test_building_line_normalizes_inputs() {
        let (mut relay, _) = relay(RelayOptions::default());
        relay.handle(BuildEvent::BundleStart {
            input: InputSpec::Named(vec![
                ("main".into(), "src/main.js".into()),
                ("worker".into(), "src/worker.js".into()),
            ]),
            output: vec![PathBuf::from("/work/dist/main.js"), PathBuf::from("/work/dist/worker.js")],
        });
        assert_eq!(
            relay.sink(),
            &vec![Status::Building {
                input: "src/main.js, src/worker.js".into(),
                output: "dist/main.js, dist/worker.js".into(),
            }]
        );
    }

    #[test]
    fn test_silent_keeps_errors_and_warnings() {
        let (mut relay, diagnostics) = relay(RelayOptions {
            silent: true,
            interactive: true,
            clear_screen: true,
        });
        diagnostics.push(Diagnostic::new("app", "deprecated flag"));

        relay.handle(BuildEvent::Start);
        relay.handle(BuildEvent::BundleStart {
            input: InputSpec::from("a.js"),
            output: vec![],
        });
        relay.handle(failure());
        relay.handle(BuildEvent::End);
        relay.reloading();

        let sink = relay.sink();
        assert_eq!(sink.len(), 2);
        assert!(matches!(sink[0], Status::Warning { .. }));
        assert!(matches!(sink[1], Status::Error { fatal: false, .. }));
    }

    #[test]
    fn test_waiting_footer_only_when_interactive() {
        let (mut quiet, _) = relay(RelayOptions::default());
        quiet.handle(BuildEvent::End);
        assert!(quiet.sink().is_empty());

        let (mut tty, _) = relay(RelayOptions {
            interactive: true,
            ..RelayOptions::default()
        });
        tty.handle(BuildEvent::End);
        assert!(matches!(tty.sink()[0], Status::Waiting { .. }));
    }

    #[test]
    fn test_banner_once_without_screen_reset() {
        let (mut relay, _) = relay(RelayOptions::default());
        relay.handle(BuildEvent::Start);
        relay.handle(BuildEvent::Start);
        assert_eq!(relay.sink().len(), 1);
        assert!(matches!(relay.sink()[0], Status::Starting { .. }));
    }

    #[test]
    fn test_banner_every_cycle_with_screen_reset() {
        let (mut relay, _) = relay(RelayOptions {
            interactive: true,
            ..RelayOptions::default()
        });
        relay.handle(BuildEvent::Start);
        relay.handle(BuildEvent::Start);
        assert_eq!(relay.sink().len(), 2);
    }

    #[test]
    fn test_timings_follow_built_line() {
        let (mut relay, _) = relay(RelayOptions::default());
        relay.handle(bundle_end(Some(vec![Timing::new("run", Duration::from_millis(80))])));

        assert_eq!(
            relay.sink()[1],
            Status::Timings {
                rows: vec![TimingRow {
                    label: "run".into(),
                    elapsed_ms: 80,
                }],
            }
        );
    }
}
