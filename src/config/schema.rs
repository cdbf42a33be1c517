//! Configuration schema definitions.
//!
//! This module defines the build file structure read by the TOML loader.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// Root of a build file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BuildFile {
    /// Watch-mode presentation settings.
    pub watch: WatchSettings,

    /// Build entries, each started as part of one watch session.
    pub build: Vec<BuildConfig>,
}

/// Watch-mode settings shared by all builds in a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Clear the terminal at the start of every rebuild.
    pub clear_screen: bool,

    /// Delay before rebuilding after a source change, so bursts settle.
    pub build_delay_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            clear_screen: true,
            build_delay_ms: 100,
        }
    }
}

/// One build entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
    /// Identifier for logs and diagnostics. Filled in by the loader when omitted.
    #[serde(default)]
    pub name: String,

    /// Build inputs.
    pub input: InputSpec,

    /// Files the build produces.
    #[serde(default)]
    pub output: Vec<PathBuf>,

    /// Shell command that performs the build.
    pub command: String,

    /// Paths watched for rebuilds (defaults to the input paths).
    #[serde(default)]
    pub watch: Vec<PathBuf>,

    /// Attach timings to every completed build.
    #[serde(default)]
    pub perf: bool,
}

impl BuildConfig {
    pub fn new(name: impl Into<String>, input: InputSpec, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input,
            output: Vec::new(),
            command: command.into(),
            watch: Vec::new(),
            perf: false,
        }
    }

    pub fn with_output(mut self, output: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.output = output.into_iter().map(Into::into).collect();
        self
    }

    /// Paths whose changes should trigger a rebuild of this entry.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        if self.watch.is_empty() {
            self.input.paths().into_iter().map(Path::to_path_buf).collect()
        } else {
            self.watch.clone()
        }
    }
}

/// Build inputs: a single path, an ordered list, or named entry points.
///
/// Named entries keep the order they were written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSpec {
    Single(PathBuf),
    List(Vec<PathBuf>),
    Named(Vec<(String, PathBuf)>),
}

impl InputSpec {
    /// Input paths in declaration order. Named entries yield their targets.
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            InputSpec::Single(path) => vec![path.as_path()],
            InputSpec::List(paths) => paths.iter().map(PathBuf::as_path).collect(),
            InputSpec::Named(entries) => entries.iter().map(|(_, path)| path.as_path()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            InputSpec::Single(path) => path.as_os_str().is_empty(),
            InputSpec::List(paths) => paths.is_empty(),
            InputSpec::Named(entries) => entries.is_empty(),
        }
    }

    /// Inputs joined with `", "` for status output.
    pub fn joined(&self) -> String {
        self.paths()
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<&str> for InputSpec {
    fn from(path: &str) -> Self {
        InputSpec::Single(PathBuf::from(path))
    }
}

impl<'de> Deserialize<'de> for InputSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct InputVisitor;

        impl<'de> Visitor<'de> for InputVisitor {
            type Value = InputSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a path, a list of paths, or a table of named paths")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<InputSpec, E> {
                Ok(InputSpec::Single(PathBuf::from(value)))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<InputSpec, A::Error> {
                let mut paths = Vec::new();
                while let Some(path) = seq.next_element::<PathBuf>()? {
                    paths.push(path);
                }
                Ok(InputSpec::List(paths))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<InputSpec, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, path)) = map.next_entry::<String, PathBuf>()? {
                    entries.push((name, path));
                }
                Ok(InputSpec::Named(entries))
            }
        }

        deserializer.deserialize_any(InputVisitor)
    }
}

/// Options given on the command line that apply on top of every loaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Force timings on for every build.
    pub perf: bool,
}
