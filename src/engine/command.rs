//! Shell command build engine.
//!
//! # Responsibilities
//! - Run each build's command once per cycle, in declaration order
//! - Watch the builds' source paths and start a new cycle on change
//! - Report progress as `BuildEvent`s
//!
//! # Design Decisions
//! - One tokio task per session; `close()` ends it and kills a running child
//! - A failing build ends the cycle without `End`
//! - Changes under declared outputs are ignored so builds do not retrigger themselves

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use crate::config::{BuildConfig, WatchSettings};
use crate::engine::event::{BuildError, BuildEvent, Timing};
use crate::engine::{BuildEngine, EventStream, WatchSession};
use crate::error::WatchError;
use crate::relay::{Diagnostic, DiagnosticBuffer};

/// Set in the environment of every build command.
pub const WATCH_ENV: &str = "BUILD_WATCH";

/// Runs build commands through the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandEngine;

/// Handle to a running command session. Dropping it closes the session.
pub struct CommandSession {
    close_tx: Option<oneshot::Sender<()>>,
}

impl WatchSession for CommandSession {
    fn close(&mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for CommandSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl BuildEngine for CommandEngine {
    type Session = CommandSession;

    fn start_watch(
        &self,
        builds: &[BuildConfig],
        settings: &WatchSettings,
        diagnostics: &DiagnosticBuffer,
    ) -> Result<(CommandSession, EventStream), WatchError> {
        let (change_tx, changes) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = change_tx.send(res);
            },
            Config::default(),
        )?;

        for build in builds {
            for path in build.watched_paths() {
                if !path.exists() {
                    diagnostics.push(Diagnostic::new(
                        build.name.clone(),
                        format!("watched path {} does not exist", path.display()),
                    ));
                    continue;
                }
                watcher
                    .watch(&path, RecursiveMode::Recursive)
                    .map_err(|e| WatchError::init(&path, e))?;
            }
        }

        let cwd = std::env::current_dir().unwrap_or_default();
        let outputs = builds
            .iter()
            .flat_map(|build| build.output.iter())
            .map(|output| absolutize(output, &cwd))
            .collect();

        let (events_tx, events) = mpsc::unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();
        let task = SessionTask {
            builds: builds.to_vec(),
            outputs,
            delay: Duration::from_millis(settings.build_delay_ms),
            diagnostics: diagnostics.clone(),
            events: events_tx,
            changes,
            _watcher: watcher,
        };
        tokio::spawn(task.run(close_rx));

        tracing::info!(builds = builds.len(), "Command session started");
        Ok((
            CommandSession {
                close_tx: Some(close_tx),
            },
            events,
        ))
    }
}

struct SessionTask {
    builds: Vec<BuildConfig>,
    outputs: Vec<PathBuf>,
    delay: Duration,
    diagnostics: DiagnosticBuffer,
    events: mpsc::UnboundedSender<Result<BuildEvent, WatchError>>,
    changes: mpsc::UnboundedReceiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl SessionTask {
    async fn run(mut self, mut close: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                biased;
                _ = &mut close => break,
                _ = self.build_all() => {}
            }

            tokio::select! {
                biased;
                _ = &mut close => break,
                changed = self.wait_for_change() => {
                    if let Err(e) = changed {
                        let _ = self.events.send(Err(e));
                        break;
                    }
                }
            }
        }
        tracing::debug!("Command session stopped");
    }

    async fn build_all(&self) {
        self.emit(BuildEvent::Start);
        for build in &self.builds {
            self.emit(BuildEvent::BundleStart {
                input: build.input.clone(),
                output: build.output.clone(),
            });
            match run_build(build, &self.diagnostics).await {
                Ok(done) => self.emit(done),
                Err(error) => {
                    self.emit(BuildEvent::Error { error });
                    return;
                }
            }
        }
        self.emit(BuildEvent::End);
    }

    async fn wait_for_change(&mut self) -> Result<(), WatchError> {
        loop {
            let event = self
                .changes
                .recv()
                .await
                .ok_or(WatchError::ChannelClosed("build watcher"))??;
            if is_source_change(&event, &self.outputs) {
                tracing::debug!(paths = ?event.paths, "Source change detected");
                break;
            }
        }

        tokio::time::sleep(self.delay).await;
        while let Ok(res) = self.changes.try_recv() {
            res?;
        }
        Ok(())
    }

    fn emit(&self, event: BuildEvent) {
        let _ = self.events.send(Ok(event));
    }
}

async fn run_build(build: &BuildConfig, diagnostics: &DiagnosticBuffer) -> Result<BuildEvent, BuildError> {
    let spawn_error = |source| BuildError::Spawn {
        name: build.name.clone(),
        source,
    };

    let started = Instant::now();
    let child = shell(&build.command)
        .env(WATCH_ENV, "true")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(spawn_error)?;
    let spawned = started.elapsed();

    let output = child.wait_with_output().await.map_err(spawn_error)?;
    let duration = started.elapsed();
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let mut text = stderr.trim().to_string();
        if text.is_empty() {
            text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
        return Err(BuildError::CommandFailed {
            name: build.name.clone(),
            code: output.status.code(),
            output: text,
        });
    }

    diagnostics.extend(
        stderr
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| Diagnostic::new(build.name.clone(), line)),
    );

    let timings = build.perf.then(|| {
        vec![
            Timing::new("spawn", spawned),
            Timing::new("run", duration.saturating_sub(spawned)),
        ]
    });

    Ok(BuildEvent::BundleEnd {
        input: build.input.clone(),
        output: build.output.clone(),
        duration,
        timings,
    })
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

fn is_source_change(event: &Event, outputs: &[PathBuf]) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant
        && event
            .paths
            .iter()
            .any(|path| !outputs.iter().any(|output| path.starts_with(output)))
}
