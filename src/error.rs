//! Fatal watch errors.
//!
//! Anything in here means a watch primitive itself is broken (the config
//! file watch, a build session, or a signal listener). These errors are
//! never recovered locally; they are routed to the shutdown path.

use std::error::Error as StdError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a watch primitive.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The filesystem watch could not be established.
    #[error("Failed to watch {path}: {reason}")]
    Init { path: PathBuf, reason: String },

    /// The notification backend reported an error after setup.
    #[error("File watcher failed: {0}")]
    Notify(#[from] notify::Error),

    /// An internal channel closed while its consumer still needed it.
    #[error("{0} channel closed unexpectedly")]
    ChannelClosed(&'static str),

    /// A build session stopped emitting events without being closed.
    #[error("Build session ended unexpectedly")]
    SessionEnded,

    /// A termination signal listener could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

impl WatchError {
    pub fn init(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Init {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Render an error together with its `source()` chain on one line.
pub fn error_chain(err: &dyn StdError) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.contains(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_includes_sources() {
        let err = WatchError::Signal(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "not allowed",
        ));
        assert_eq!(
            error_chain(&err),
            "Failed to install signal handler: not allowed"
        );
    }

    #[test]
    fn test_error_chain_appends_unseen_causes() {
        #[derive(Debug, Error)]
        #[error("outer")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "inner"));
        assert_eq!(error_chain(&err), "outer: inner");
    }
}
