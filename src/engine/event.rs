//! Build lifecycle events.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::config::InputSpec;

/// Time spent in one phase of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub label: String,
    pub elapsed: Duration,
}

impl Timing {
    pub fn new(label: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            label: label.into(),
            elapsed,
        }
    }
}

/// A failed build. The session keeps watching.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build '{name}' could not start: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("build '{name}' failed{}{}", exit_suffix(.code), output_suffix(.output))]
    CommandFailed {
        name: String,
        code: Option<i32>,
        output: String,
    },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => " (terminated by signal)".to_string(),
    }
}

fn output_suffix(output: &str) -> String {
    let output = output.trim();
    if output.is_empty() {
        String::new()
    } else {
        format!("\n{}", output)
    }
}

/// Events emitted by a watch session, in emission order.
#[derive(Debug)]
pub enum BuildEvent {
    /// A rebuild cycle begins.
    Start,
    /// One build begins.
    BundleStart {
        input: InputSpec,
        output: Vec<PathBuf>,
    },
    /// One build finished successfully.
    BundleEnd {
        input: InputSpec,
        output: Vec<PathBuf>,
        duration: Duration,
        timings: Option<Vec<Timing>>,
    },
    /// The cycle finished; the session waits for source changes.
    End,
    /// A build failed; the cycle ends without `End`.
    Error { error: BuildError },
}

impl BuildEvent {
    pub fn code(&self) -> &'static str {
        match self {
            BuildEvent::Start => "START",
            BuildEvent::BundleStart { .. } => "BUNDLE_START",
            BuildEvent::BundleEnd { .. } => "BUNDLE_END",
            BuildEvent::End => "END",
            BuildEvent::Error { .. } => "ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = BuildError::CommandFailed {
            name: "app".into(),
            code: Some(2),
            output: "src/main.c:3: error\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "build 'app' failed with exit code 2\nsrc/main.c:3: error"
        );

        let err = BuildError::CommandFailed {
            name: "app".into(),
            code: None,
            output: String::new(),
        };
        assert_eq!(err.to_string(), "build 'app' failed (terminated by signal)");
    }
}
