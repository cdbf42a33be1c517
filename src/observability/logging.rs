//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Map CLI verbosity to a default filter
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Logs go to stderr and stay quiet by default; status lines are the UI
//! - `RUST_LOG` overrides the verbosity flag

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "build_watch=warn",
        1 => "build_watch=info",
        2 => "build_watch=debug",
        _ => "build_watch=trace",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(verbosity).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
