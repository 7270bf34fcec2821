//! monodeps configuration
//!
//! `monodeps.toml` marks the workspace root and holds its configuration:
//!
//! ```toml
//! [packages]
//! marker = "package.toml"
//! exclude = ["**/generated/**"]
//! respect_gitignore = true
//!
//! [python]
//! requirements = ["requirements.txt", "requirements-dev.txt"]
//!
//! [inference]
//! enabled = ["rust", "python"]
//! ```
//!
//! Every section is optional. CLI flags are applied last via [`ConfigOverrides`].

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, ROOT_CONFIG_FILE};

use monodeps_core::manifest::DEFAULT_REQUIREMENTS;
use monodeps_core::marker::DEFAULT_MARKER;
use monodeps_core::BuildKind;
use serde::{Deserialize, Serialize};

/// Root configuration, as read from `monodeps.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonodepsConfig {
    /// Package discovery
    pub packages: PackagesConfig,

    /// Python inference
    pub python: PythonConfig,

    /// Inferrer selection
    pub inference: InferenceConfig,
}

/// Package discovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackagesConfig {
    /// File name marking a package directory
    pub marker: String,

    /// Glob patterns excluded in addition to the built-in ones
    pub exclude: Vec<String>,

    /// Honour `.gitignore` files while walking
    pub respect_gitignore: bool,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            exclude: Vec::new(),
            respect_gitignore: true,
        }
    }
}

/// Python inference configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PythonConfig {
    /// Requirements file names, checked in order before `pyproject.toml`
    pub requirements: Vec<String>,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            requirements: vec![DEFAULT_REQUIREMENTS.to_string()],
        }
    }
}

/// Which inferrers are registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    pub enabled: Vec<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: vec![BuildKind::Rust.to_string(), BuildKind::Python.to_string()],
        }
    }
}

impl InferenceConfig {
    /// Parse `enabled` into build kinds. Aliases such as `cargo` and `py`
    /// are accepted; `generic` is not an inferrer.
    pub fn kinds(&self) -> Result<Vec<BuildKind>, ConfigError> {
        self.enabled
            .iter()
            .map(|name| match name.parse::<BuildKind>() {
                Ok(kind) if kind != BuildKind::Generic => Ok(kind),
                _ => Err(ConfigError::invalid_value(
                    "inference.enabled",
                    format!(
                        "unknown build kind '{}'. Valid values: {}, {}",
                        name,
                        BuildKind::Rust,
                        BuildKind::Python
                    ),
                )),
            })
            .collect()
    }
}

/// Values supplied on the command line, applied over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override the package marker file name
    pub marker: Option<String>,

    /// Extra exclude globs, appended to the configured ones
    pub exclude: Vec<String>,

    /// Override `.gitignore` handling
    pub respect_gitignore: Option<bool>,
}

impl MonodepsConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref marker) = overrides.marker {
            self.packages.marker = marker.clone();
        }

        self.packages
            .exclude
            .extend(overrides.exclude.iter().cloned());

        if let Some(respect) = overrides.respect_gitignore {
            self.packages.respect_gitignore = respect;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_file_name("packages.marker", &self.packages.marker)?;

        if self.packages.exclude.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "packages.exclude",
                "patterns must not be empty",
            ));
        }

        if self.python.requirements.is_empty() {
            return Err(ConfigError::invalid_value(
                "python.requirements",
                "at least one file name is required",
            ));
        }
        for name in &self.python.requirements {
            validate_file_name("python.requirements", name)?;
        }

        self.inference.kinds()?;

        Ok(())
    }
}

fn validate_file_name(key: &str, name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::invalid_value(key, "must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ConfigError::invalid_value(
            key,
            format!("'{}' must be a plain file name", name),
        ));
    }
    Ok(())
}
