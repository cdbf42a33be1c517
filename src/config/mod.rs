//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! build file (TOML)
//!     → loader.rs (read, parse & deserialize, merge CLI options)
//!     → validation.rs (semantic checks, warnings)
//!     → LoadedConfig (builds + settings + warnings)
//!
//! On change:
//!     watcher.rs reports a notification
//!     → reload coordinator re-reads and compares content
//!     → loader.rs loads new config
//!     → session manager replaces the running watch session
//! ```
//!
//! # Design Decisions
//! - Loading is behind the `ConfigLoader` trait; the coordinator never parses
//! - Unknown keys are warnings, not errors
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigLoader, LoadFuture, LoadedConfig, TomlConfigLoader};
pub use schema::{BuildConfig, CommandOptions, InputSpec, WatchSettings};
pub use watcher::{ChangeKind, ConfigChangeDetector, RawChangeEvent};

/// File name used when `--config` is given without a value.
pub const DEFAULT_CONFIG_FILE: &str = "build-watch.toml";
