//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject build entries that cannot be started
//! - Collect non-fatal findings as warnings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BuildFile → Result<warnings, Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::BuildFile;
use crate::relay::Diagnostic;

/// A problem that makes a build file unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Build entry the error belongs to, if any.
    pub build: Option<String>,
    pub message: String,
}

impl ValidationError {
    fn file(message: impl Into<String>) -> Self {
        Self {
            build: None,
            message: message.into(),
        }
    }

    fn build(name: &str, message: impl Into<String>) -> Self {
        Self {
            build: Some(name.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.build {
            Some(name) => write!(f, "build '{}': {}", name, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Validate a parsed build file.
///
/// Build names must already be filled in.
pub fn validate_config(file: &BuildFile) -> Result<Vec<Diagnostic>, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if file.build.is_empty() {
        errors.push(ValidationError::file("no [[build]] entries defined"));
    }

    let mut seen = HashSet::new();
    for build in &file.build {
        if !seen.insert(build.name.as_str()) {
            errors.push(ValidationError::build(&build.name, "duplicate build name"));
        }
        if build.input.is_empty() {
            errors.push(ValidationError::build(&build.name, "input must not be empty"));
        }
        if build.command.trim().is_empty() {
            errors.push(ValidationError::build(&build.name, "command must not be empty"));
        }
        if build.output.is_empty() {
            warnings.push(Diagnostic::new(
                build.name.clone(),
                "no outputs declared; status lines will not name any files",
            ));
        }
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(errors)
    }
}
