//! Configuration loading from disk.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::config::schema::{BuildConfig, BuildFile, CommandOptions, WatchSettings};
use crate::config::validation::{validate_config, ValidationError};
use crate::relay::Diagnostic;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Could not read config: {}", e),
            ConfigError::Parse(e) => write!(f, "Could not parse config: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Invalid config: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

/// The outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub builds: Vec<BuildConfig>,
    pub settings: WatchSettings,
    /// Non-fatal findings, shown at the next diagnostic flush.
    pub warnings: Vec<Diagnostic>,
}

impl LoadedConfig {
    /// A single command-line build with default settings.
    pub fn from_build(build: BuildConfig) -> Self {
        Self {
            builds: vec![build],
            settings: WatchSettings::default(),
            warnings: Vec::new(),
        }
    }
}

/// In-flight load. Polled only from the supervisor's thread, so no `Send` bound.
pub type LoadFuture = Pin<Box<dyn Future<Output = Result<LoadedConfig, ConfigError>>>>;

/// Source of build configurations.
///
/// `load` may take arbitrarily long; the returned future must not borrow
/// from the loader.
pub trait ConfigLoader {
    fn load(&self, path: &Path) -> LoadFuture;
}

/// Loads TOML build files.
#[derive(Debug, Clone, Default)]
pub struct TomlConfigLoader {
    options: CommandOptions,
}

impl TomlConfigLoader {
    pub fn new(options: CommandOptions) -> Self {
        Self { options }
    }
}

impl ConfigLoader for TomlConfigLoader {
    fn load(&self, path: &Path) -> LoadFuture {
        let path = path.to_path_buf();
        let options = self.options.clone();
        Box::pin(async move { load_config(&path, &options).await })
    }
}

/// Load and validate a build file.
pub async fn load_config(path: &Path, options: &CommandOptions) -> Result<LoadedConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path).await.map_err(ConfigError::Io)?;
    let loaded = parse_config(&content, options)?;

    tracing::debug!(
        path = %path.display(),
        builds = loaded.builds.len(),
        warnings = loaded.warnings.len(),
        "Config loaded"
    );
    Ok(loaded)
}

/// Parse build file contents, apply command options and validate.
pub fn parse_config(content: &str, options: &CommandOptions) -> Result<LoadedConfig, ConfigError> {
    let mut unknown_keys: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);

    let mut file: BuildFile = serde_ignored::deserialize(deserializer, |path| {
        unknown_keys.push(path.to_string());
    })
    .map_err(ConfigError::Parse)?;

    for (index, build) in file.build.iter_mut().enumerate() {
        if build.name.is_empty() {
            build.name = format!("build-{}", index + 1);
        }
        build.perf |= options.perf;
    }

    let mut warnings: Vec<Diagnostic> = unknown_keys
        .into_iter()
        .map(|key| Diagnostic::new("config", format!("unknown key '{}' ignored", key)))
        .collect();
    warnings.extend(validate_config(&file).map_err(ConfigError::Validation)?);

    Ok(LoadedConfig {
        builds: file.build,
        settings: file.watch,
        warnings,
    })
}
