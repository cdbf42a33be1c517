//! Buffered non-fatal diagnostics.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

/// A non-fatal warning from the config loader or a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// What produced the warning (build name, `config`, ...).
    pub source: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Warnings accumulated since the last flush point.
///
/// Cloning yields another handle to the same buffer. Producers push from
/// any thread; the relay drains at flush points.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBuffer {
    inner: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.lock().extend(diagnostics);
    }

    /// Take everything buffered so far, in the order it was produced.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // A panic while holding the lock cannot leave a Vec half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_buffer() {
        let buffer = DiagnosticBuffer::new();
        let producer = buffer.clone();
        producer.push(Diagnostic::new("app", "first"));
        producer.push(Diagnostic::new("app", "second"));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "first");
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }
}
