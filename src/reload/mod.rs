//! Config reload subsystem.
//!
//! # Data Flow
//! ```text
//! change notification
//!     → coordinator.rs (snapshot compare, coalesce while busy)
//!     → ConfigLoader::load (in flight, polled by the supervisor)
//!     → ReloadCompletion (Loaded / Failed / Superseded)
//! ```

pub mod coordinator;
pub mod state;

pub use coordinator::{ReloadCompletion, ReloadCoordinator, ReloadStep};
pub use state::ReloadState;
