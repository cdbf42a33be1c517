//! Configuration file watcher for hot reload.
//!
//! Watches the parent directory rather than the file itself, so a save that
//! replaces the file (write to temp, rename over) keeps being observed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;

/// Kind of a raw notification for the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The file was written or (re)created.
    Changed,
    /// The file was moved away or removed.
    Renamed,
    Other,
}

/// One notification about the watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChangeEvent {
    pub kind: ChangeKind,
}

/// Emits a notification whenever the config file may have changed.
///
/// Notifications are not deduplicated: one save can produce several, and a
/// notification does not guarantee the content differs.
pub struct ConfigChangeDetector {
    target: PathBuf,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl ConfigChangeDetector {
    /// Start watching `path`. The file must exist.
    pub fn observe(path: &Path) -> Result<Self, WatchError> {
        let target = path
            .canonicalize()
            .map_err(|e| WatchError::init(path, e))?;
        let parent = target
            .parent()
            .ok_or_else(|| WatchError::init(path, "config file has no parent directory"))?
            .to_path_buf();

        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(|e| WatchError::init(path, e))?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::init(path, e))?;

        tracing::info!(path = %target.display(), "Config watcher started");
        Ok(Self {
            target,
            events,
            _watcher: watcher,
        })
    }

    /// Next notification concerning the watched file.
    ///
    /// Cancel safe: an event is either returned or left in the channel.
    pub async fn next_raw(&mut self) -> Result<RawChangeEvent, WatchError> {
        loop {
            let event = self
                .events
                .recv()
                .await
                .ok_or(WatchError::ChannelClosed("config watcher"))??;

            if let Some(kind) = classify(&event, &self.target) {
                tracing::trace!(kind = ?kind, event = ?event.kind, "Config file notification");
                return Ok(RawChangeEvent { kind });
            }
        }
    }

    /// Resolve on the next `Changed` notification, skipping all others.
    pub async fn changed(&mut self) -> Result<(), WatchError> {
        loop {
            if self.next_raw().await?.kind == ChangeKind::Changed {
                return Ok(());
            }
        }
    }

    /// Stop watching.
    pub fn close(self) {
        tracing::debug!(path = %self.target.display(), "Config watcher closed");
    }
}

/// Classify `event` with respect to `target`. Returns `None` for events
/// about other files in the same directory.
pub fn classify(event: &Event, target: &Path) -> Option<ChangeKind> {
    if !event.paths.iter().any(|p| p == target) {
        return None;
    }

    let kind = match &event.kind {
        EventKind::Create(_) => ChangeKind::Changed,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Renamed,
        EventKind::Modify(ModifyKind::Name(_)) => {
            if target.exists() {
                ChangeKind::Changed
            } else {
                ChangeKind::Renamed
            }
        }
        EventKind::Modify(_) => ChangeKind::Changed,
        EventKind::Remove(_) => ChangeKind::Renamed,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => ChangeKind::Other,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn test_ignores_other_files() {
        let ev = event(EventKind::Create(CreateKind::File), Path::new("/tmp/other.toml"));
        assert_eq!(classify(&ev, Path::new("/tmp/build.toml")), None);
    }

    #[test]
    fn test_writes_are_changes() {
        let target = Path::new("/tmp/build.toml");
        let write = event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), target);
        let create = event(EventKind::Create(CreateKind::File), target);
        assert_eq!(classify(&write, target), Some(ChangeKind::Changed));
        assert_eq!(classify(&create, target), Some(ChangeKind::Changed));
    }

    #[test]
    fn test_removal_and_rename_away() {
        let target = Path::new("/tmp/build.toml");
        let removed = event(EventKind::Remove(RemoveKind::File), target);
        let moved = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), target);
        assert_eq!(classify(&removed, target), Some(ChangeKind::Renamed));
        assert_eq!(classify(&moved, target), Some(ChangeKind::Renamed));
    }

    #[test]
    fn test_rename_onto_existing_file_is_change() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build.toml");
        std::fs::write(&target, "x").unwrap();

        let ev = event(EventKind::Modify(ModifyKind::Name(RenameMode::To)), &target);
        assert_eq!(classify(&ev, &target), Some(ChangeKind::Changed));
    }

    #[test]
    fn test_access_is_other() {
        let target = Path::new("/tmp/build.toml");
        let ev = event(EventKind::Access(AccessKind::Any), target);
        assert_eq!(classify(&ev, target), Some(ChangeKind::Other));
    }

    async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
        tokio::time::timeout(Duration::from_secs(10), fut)
            .await
            .expect("timed out waiting for a config notification")
    }

    /// Swap the live notify channel for one the test controls.
    fn detached(detector: &mut ConfigChangeDetector) -> mpsc::UnboundedSender<notify::Result<Event>> {
        let (tx, rx) = mpsc::unbounded_channel();
        detector.events = rx;
        tx
    }

    #[tokio::test]
    async fn test_live_write_remove_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build.toml");
        std::fs::write(&target, "a.js").unwrap();
        let mut detector = ConfigChangeDetector::observe(&target).unwrap();

        std::fs::write(&target, "b.js").unwrap();
        within(detector.changed()).await.unwrap();

        std::fs::remove_file(&target).unwrap();
        loop {
            let raw = within(detector.next_raw()).await.unwrap();
            if raw.kind == ChangeKind::Renamed {
                break;
            }
        }

        std::fs::write(&target, "c.js").unwrap();
        within(detector.changed()).await.unwrap();
        detector.close();
    }

    #[tokio::test]
    async fn test_changed_skips_renames_and_other() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build.toml");
        std::fs::write(&target, "a.js").unwrap();
        let mut detector = ConfigChangeDetector::observe(&target).unwrap();
        let tx = detached(&mut detector);
        let canonical = detector.target.clone();

        tx.send(Ok(event(EventKind::Remove(RemoveKind::File), &canonical))).unwrap();
        tx.send(Ok(event(EventKind::Access(AccessKind::Any), &canonical))).unwrap();
        tx.send(Ok(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &canonical,
        )))
        .unwrap();

        within(detector.changed()).await.unwrap();
        assert!(detector.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_backend_error_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("build.toml");
        std::fs::write(&target, "a.js").unwrap();
        let mut detector = ConfigChangeDetector::observe(&target).unwrap();
        let tx = detached(&mut detector);

        tx.send(Err(notify::Error::generic("inotify queue overflow"))).unwrap();
        assert!(matches!(within(detector.changed()).await, Err(WatchError::Notify(_))));

        drop(tx);
        assert!(matches!(
            within(detector.changed()).await,
            Err(WatchError::ChannelClosed(_))
        ));
    }

    #[test]
    fn test_observe_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConfigChangeDetector::observe(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(WatchError::Init { .. })));
    }
}
