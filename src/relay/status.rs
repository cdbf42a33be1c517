//! Status lines and the sinks that render them.
//!
//! # Responsibilities
//! - Define the operator-facing status vocabulary
//! - Render it for a terminal (colors, screen reset) or as NDJSON
//!
//! # Design Decisions
//! - Status values carry data, not text; sinks own all formatting
//! - Sinks never fail the caller: write errors are dropped

use std::io::{self, IsTerminal, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::{style, StyledContent, Stylize};
use crossterm::terminal::{Clear, ClearType};
use serde::Serialize;

use crate::relay::format::humanize_duration;

/// One row of a timings report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimingRow {
    pub label: String,
    pub elapsed_ms: u64,
}

/// Everything the watcher reports to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Status {
    /// A changed config file is being loaded.
    Reloading,
    /// A rebuild cycle started.
    Starting { version: String },
    /// A build began.
    Building { input: String, output: String },
    /// A build finished.
    Built { output: String, duration_ms: u64 },
    /// Per-phase timings of a finished build.
    Timings { rows: Vec<TimingRow> },
    /// The cycle finished; waiting for the next change.
    Waiting { at: String },
    Warning { source: String, message: String },
    Error { message: String, fatal: bool },
}

/// Destination for status output.
pub trait StatusSink {
    fn emit(&mut self, status: &Status);

    /// Reset the display before a new cycle. Most sinks ignore this.
    fn clear_screen(&mut self) {}
}

impl<S: StatusSink + ?Sized> StatusSink for Box<S> {
    fn emit(&mut self, status: &Status) {
        (**self).emit(status);
    }

    fn clear_screen(&mut self) {
        (**self).clear_screen();
    }
}

/// Collects statuses in memory.
impl StatusSink for Vec<Status> {
    fn emit(&mut self, status: &Status) {
        self.push(status.clone());
    }
}

/// Human-readable output, colored when attached to a terminal.
pub struct TerminalSink<W: Write> {
    out: W,
    color: bool,
}

impl TerminalSink<io::Stderr> {
    /// Write to stderr, colored unless stderr is redirected or `NO_COLOR` is set.
    pub fn stderr() -> Self {
        let color = io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self::new(io::stderr(), color)
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, f: impl Fn(StyledContent<&str>) -> StyledContent<&str>) -> String {
        if self.color {
            f(style(text)).to_string()
        } else {
            text.to_string()
        }
    }

    fn render(&self, status: &Status) -> String {
        match status {
            Status::Reloading => "\nReloading updated config...".to_string(),
            Status::Starting { version } => {
                self.paint(&format!("build-watch v{}", version), |s| s.underlined())
            }
            Status::Building { input, output } => format!(
                "{}{}{}{}{}",
                self.paint("building ", |s| s.cyan()),
                self.paint(input, |s| s.cyan().bold()),
                self.paint(" → ", |s| s.cyan()),
                self.paint(output, |s| s.cyan().bold()),
                self.paint("...", |s| s.cyan()),
            ),
            Status::Built { output, duration_ms } => format!(
                "{}{}{}{}",
                self.paint("built ", |s| s.green()),
                self.paint(output, |s| s.green().bold()),
                self.paint(" in ", |s| s.green()),
                self.paint(
                    &humanize_duration(std::time::Duration::from_millis(*duration_ms)),
                    |s| s.green().bold()
                ),
            ),
            Status::Timings { rows } => rows
                .iter()
                .map(|row| format!("{}: {}ms", row.label, row.elapsed_ms))
                .collect::<Vec<_>>()
                .join("\n"),
            Status::Waiting { at } => format!("\n[{}] waiting for changes...", at),
            Status::Warning { source, message } => format!(
                "{} {}",
                self.paint(&format!("(!) {}:", source), |s| s.yellow().bold()),
                message
            ),
            Status::Error { message, .. } => {
                format!("{} {}", self.paint("[!]", |s| s.red().bold()), message)
            }
        }
    }
}

impl<W: Write> StatusSink for TerminalSink<W> {
    fn emit(&mut self, status: &Status) {
        let line = self.render(status);
        let _ = writeln!(self.out, "{}", line);
    }

    fn clear_screen(&mut self) {
        let _ = crossterm::execute!(self.out, Clear(ClearType::All), MoveTo(0, 0));
    }
}

/// One JSON object per status line, for CI and editor integrations.
pub struct JsonSink<W: Write> {
    out: W,
}

impl JsonSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusSink for JsonSink<W> {
    fn emit(&mut self, status: &Status) {
        if serde_json::to_writer(&mut self.out, status).is_ok() {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
    }
}
