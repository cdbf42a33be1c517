//! Reload state machine.
//!
//! ```text
//!            change (content differs)
//!   Idle ─────────────────────────────▶ Reloading
//!    ▲                                    │  change
//!    │ load done                          ▼
//!    ├──────────────────────── ReloadingPendingRetry ◀─┐
//!    │ load done: retry owed              │  change    │
//!    │                                    └────────────┘
//! ```

/// Where the coordinator is in a reload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReloadState {
    /// No load in flight.
    #[default]
    Idle,
    /// A load is in flight.
    Reloading,
    /// A load is in flight and at least one change arrived since it began.
    ReloadingPendingRetry,
}

impl ReloadState {
    /// Whether a load is in flight.
    pub fn is_busy(self) -> bool {
        !matches!(self, ReloadState::Idle)
    }

    /// State after a change notification arrives mid-load.
    ///
    /// Any number of notifications collapse into one pending retry.
    pub(crate) fn coalesce(self) -> Self {
        match self {
            ReloadState::Idle => ReloadState::Idle,
            ReloadState::Reloading | ReloadState::ReloadingPendingRetry => {
                ReloadState::ReloadingPendingRetry
            }
        }
    }

    /// Leave the in-flight state. The flag tells whether a retry is owed.
    pub(crate) fn complete(self) -> (Self, bool) {
        (
            ReloadState::Idle,
            matches!(self, ReloadState::ReloadingPendingRetry),
        )
    }
}
