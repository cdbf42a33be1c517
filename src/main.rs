//! build-watch
//!
//! Keeps a set of builds running in watch mode, restarts them when the
//! build file changes, and reports progress as status lines.
//!
//! # Architecture Overview
//!
//! ```text
//!   build-watch.toml ──▶ ConfigChangeDetector ──▶ ReloadCoordinator ──▶ ConfigLoader
//!                                                        │
//!                                                        ▼ LoadedConfig
//!   SIGINT/SIGTERM/SIGHUP ─┐                    WatchSessionManager ──▶ BuildEngine
//!   stdin EOF ─────────────┼──▶ Supervisor ◀──────────── │ BuildEvent
//!   fatal WatchError ──────┘        │                    ▼
//!                                   └──────────▶ BuildEventRelay ──▶ StatusSink
//! ```

use std::any::Any;
use std::future::Future;
use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::task::JoinError;

use build_watch::config::validation::validate_config;
use build_watch::config::schema::BuildFile;
use build_watch::config::{
    BuildConfig, CommandOptions, ConfigChangeDetector, ConfigError, InputSpec, LoadedConfig, TomlConfigLoader,
    DEFAULT_CONFIG_FILE,
};
use build_watch::engine::CommandEngine;
use build_watch::error::error_chain;
use build_watch::lifecycle::{ShutdownReason, Supervisor, Triggers};
use build_watch::observability::{logging, metrics};
use build_watch::relay::{JsonSink, RelayOptions, Status, StatusSink, TerminalSink};
use build_watch::reload::ReloadCoordinator;

#[derive(Parser, Debug)]
#[command(name = "build-watch", version)]
#[command(about = "Rebuild on change, restart when the build file changes", long_about = None)]
struct Cli {
    /// Build file to load and watch (bare flag uses ./build-watch.toml)
    #[arg(short, long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_CONFIG_FILE)]
    config: Option<PathBuf>,

    /// Inputs when no build file is used
    #[arg(short, long, value_name = "PATH", num_args = 1.., required_unless_present = "config")]
    input: Vec<PathBuf>,

    /// Outputs when no build file is used
    #[arg(short, long, value_name = "PATH", num_args = 1..)]
    output: Vec<PathBuf>,

    /// Build command when no build file is used
    #[arg(long, value_name = "CMD", required_unless_present = "config")]
    command: Option<String>,

    /// Suppress status lines (errors and warnings still print)
    #[arg(long)]
    silent: bool,

    /// Attach timings to every build
    #[arg(long)]
    perf: bool,

    /// Emit status as NDJSON on stdout
    #[arg(long)]
    json: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long, value_name = "ADDR")]
    metrics_address: Option<SocketAddr>,

    /// Raise the log level (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn command_options(&self) -> CommandOptions {
        CommandOptions { perf: self.perf }
    }

    /// The single build described by command-line flags.
    fn build(&self) -> Result<LoadedConfig, ConfigError> {
        let input = match self.input.as_slice() {
            [single] => InputSpec::Single(single.clone()),
            many => InputSpec::List(many.to_vec()),
        };
        let mut build = BuildConfig::new("build-1", input, self.command.clone().unwrap_or_default())
            .with_output(self.output.iter().cloned());
        build.perf = self.perf;

        let file = BuildFile {
            build: vec![build],
            ..BuildFile::default()
        };
        let warnings = validate_config(&file).map_err(ConfigError::Validation)?;
        Ok(LoadedConfig {
            builds: file.build,
            settings: file.watch,
            warnings,
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Some(addr) = cli.metrics_address {
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint");
        }
    }

    install_panic_hook(cli.json);
    let code = supervise(run(cli)).await;
    // Exit explicitly: the stdin trigger may still be parked in a blocking read.
    std::process::exit(code);
}

/// Drive `work` as a local task, so a panic surfaces as a failed join after
/// the task's state (and with it the active session) has been dropped.
async fn supervise(work: impl Future<Output = i32> + 'static) -> i32 {
    let local = tokio::task::LocalSet::new();
    exit_status(local.run_until(tokio::task::spawn_local(work)).await)
}

fn exit_status(result: Result<i32, JoinError>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Supervisor task failed");
            1
        }
    }
}

/// Report panics as fatal status lines on the same channel as other errors.
fn install_panic_hook(json: bool) {
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| format!(" at {}:{}", l.file(), l.line()))
            .unwrap_or_default();
        let status = Status::Error {
            message: format!("Uncaught panic{}: {}", location, panic_message(info.payload())),
            fatal: true,
        };
        if json {
            JsonSink::stdout().emit(&status);
        } else {
            TerminalSink::stderr().emit(&status);
        }
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown cause"
    }
}

async fn run(cli: Cli) -> i32 {
    let mut sink: Box<dyn StatusSink> = if cli.json {
        Box::new(JsonSink::stdout())
    } else {
        Box::new(TerminalSink::stderr())
    };
    let options = RelayOptions {
        silent: cli.silent,
        interactive: !cli.json && std::io::stderr().is_terminal(),
        ..RelayOptions::default()
    };

    let initial = match &cli.config {
        Some(_) => None,
        None => match cli.build() {
            Ok(loaded) => Some(loaded),
            Err(e) => {
                sink.emit(&Status::Error {
                    message: error_chain(&e),
                    fatal: true,
                });
                return 1;
            }
        },
    };

    let mut supervisor: Supervisor<TomlConfigLoader, CommandEngine, Box<dyn StatusSink>> =
        Supervisor::new(CommandEngine, sink, options);

    if let Some(path) = cli.config.clone() {
        let detector = match ConfigChangeDetector::observe(&path) {
            Ok(detector) => detector,
            Err(e) => return supervisor.shutdown(ShutdownReason::Fatal(e)).unwrap_or(1),
        };
        let reload = ReloadCoordinator::new(path, TomlConfigLoader::new(cli.command_options()));
        supervisor = supervisor.with_config(reload, Some(detector));
        supervisor.start_config();
    }

    if let Some(loaded) = initial {
        if let Err(e) = supervisor.start_builds(loaded) {
            return supervisor.shutdown(ShutdownReason::Fatal(e)).unwrap_or(1);
        }
    }

    let triggers = Triggers::new();
    triggers.install(supervisor.shutdown_coordinator(), !std::io::stdin().is_terminal());
    supervisor.run(triggers).await
}
