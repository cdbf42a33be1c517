//! Shared fakes for integration testing.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use build_watch::config::{BuildConfig, ConfigError, ConfigLoader, InputSpec, LoadFuture, LoadedConfig, WatchSettings};
use build_watch::engine::{BuildEngine, BuildEvent, EventStream, WatchSession};
use build_watch::error::WatchError;
use build_watch::relay::{DiagnosticBuffer, Status, StatusSink};

/// Config loader whose loads stay in flight until the test releases them.
///
/// Each load reads the file when it starts and yields one build whose input
/// is the trimmed file content.
#[derive(Clone, Default)]
pub struct GatedLoader {
    gates: Rc<RefCell<Vec<Option<oneshot::Sender<Result<(), String>>>>>>,
    contents: Rc<RefCell<Vec<String>>>,
}

impl GatedLoader {
    /// Number of loads started so far.
    pub fn calls(&self) -> usize {
        self.gates.borrow().len()
    }

    /// File content each load saw, in start order.
    pub fn contents(&self) -> Vec<String> {
        self.contents.borrow().clone()
    }

    /// Let load `index` succeed.
    pub fn release(&self, index: usize) {
        self.open(index, Ok(()));
    }

    /// Let load `index` fail with `message`.
    pub fn fail(&self, index: usize, message: &str) {
        self.open(index, Err(message.to_string()));
    }

    fn open(&self, index: usize, outcome: Result<(), String>) {
        let gate = self.gates.borrow_mut()[index].take();
        if let Some(gate) = gate {
            let _ = gate.send(outcome);
        }
    }
}

impl ConfigLoader for GatedLoader {
    fn load(&self, path: &Path) -> LoadFuture {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        let (tx, rx) = oneshot::channel();
        self.gates.borrow_mut().push(Some(tx));
        self.contents.borrow_mut().push(content.clone());

        Box::pin(async move {
            match rx.await {
                Ok(Ok(())) => Ok(LoadedConfig::from_build(build_for(content.trim()))),
                Ok(Err(message)) => Err(ConfigError::Io(io::Error::new(io::ErrorKind::Other, message))),
                Err(_) => Err(ConfigError::Io(io::Error::new(io::ErrorKind::Other, "gate dropped"))),
            }
        })
    }
}

pub fn build_for(input: &str) -> BuildConfig {
    BuildConfig::new("app", InputSpec::from(input), "true").with_output(["dist/app.js"])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    /// A session started for these inputs.
    Started(Vec<String>),
    /// Session number `n` (1-based) was closed.
    Closed(usize),
}

/// Build engine that records calls and lets the test feed session events.
#[derive(Clone, Default)]
pub struct FakeEngine {
    calls: Rc<RefCell<Vec<EngineCall>>>,
    senders: Rc<RefCell<Vec<Option<mpsc::UnboundedSender<Result<BuildEvent, WatchError>>>>>>,
    fail_start: Rc<Cell<bool>>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    /// Inputs of every session started, in order.
    pub fn started(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::Started(inputs) => Some(inputs.clone()),
                EngineCall::Closed(_) => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, EngineCall::Closed(_)))
            .count()
    }

    /// Make the next `start_watch` calls fail.
    pub fn fail_start(&self) {
        self.fail_start.set(true);
    }

    /// Emit `event` on the latest session.
    pub fn emit(&self, event: BuildEvent) {
        if let Some(Some(tx)) = self.senders.borrow().last() {
            let _ = tx.send(Ok(event));
        }
    }

    /// Drop the latest session's sender so its stream ends.
    pub fn end_stream(&self) {
        if let Some(slot) = self.senders.borrow_mut().last_mut() {
            slot.take();
        }
    }
}

pub struct FakeSession {
    id: usize,
    calls: Rc<RefCell<Vec<EngineCall>>>,
}

impl WatchSession for FakeSession {
    fn close(&mut self) {
        self.calls.borrow_mut().push(EngineCall::Closed(self.id));
    }
}

impl BuildEngine for FakeEngine {
    type Session = FakeSession;

    fn start_watch(
        &self,
        builds: &[BuildConfig],
        _settings: &WatchSettings,
        _diagnostics: &DiagnosticBuffer,
    ) -> Result<(FakeSession, EventStream), WatchError> {
        if self.fail_start.get() {
            return Err(WatchError::init("fake", "refused"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let mut senders = self.senders.borrow_mut();
        senders.push(Some(tx));
        let id = senders.len();

        let inputs = builds.iter().map(|build| build.input.joined()).collect();
        self.calls.borrow_mut().push(EngineCall::Started(inputs));
        Ok((
            FakeSession {
                id,
                calls: self.calls.clone(),
            },
            rx,
        ))
    }
}

/// Status sink the test keeps a handle to after handing it away.
#[derive(Clone, Default)]
pub struct SharedSink(Rc<RefCell<Vec<Status>>>);

impl SharedSink {
    pub fn statuses(&self) -> Vec<Status> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

impl StatusSink for SharedSink {
    fn emit(&mut self, status: &Status) {
        self.0.borrow_mut().push(status.clone());
    }
}

/// Write `content` to a fresh build file.
pub fn config_file(content: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build-watch.toml");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

pub fn edit(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

/// Poll `done` until it holds, letting the runtime and the filesystem catch up.
pub async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..500 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within 10s");
}
