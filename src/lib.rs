//! Watch coordinator for an incremental build tool.

pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod reload;
pub mod session;

pub use config::schema::BuildConfig;
pub use engine::CommandEngine;
pub use error::WatchError;
pub use lifecycle::{ShutdownCoordinator, Supervisor};
