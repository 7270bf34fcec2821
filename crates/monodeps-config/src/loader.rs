//! Configuration loader.
//!
//! Locates the workspace root by walking up to the nearest `monodeps.toml`,
//! reads it (or an explicitly given file), then applies CLI overrides.

use crate::error::ConfigError;
use crate::{ConfigOverrides, MonodepsConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// File marking the workspace root and holding its configuration.
pub const ROOT_CONFIG_FILE: &str = "monodeps.toml";

/// Configuration loader.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Explicit configuration file, used instead of `<root>/monodeps.toml`
    config_file: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader reading `monodeps.toml` from the workspace root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a loader reading an explicit configuration file.
    pub fn with_config_file(path: impl Into<PathBuf>) -> Self {
        Self {
            config_file: Some(path.into()),
        }
    }

    /// Find the workspace root: `start` or its nearest ancestor holding
    /// `monodeps.toml`.
    pub fn locate_root(start: &Path) -> Result<PathBuf, ConfigError> {
        let start = start
            .canonicalize()
            .map_err(|e| ConfigError::read_file(start, e))?;

        for dir in start.ancestors() {
            let candidate = dir.join(ROOT_CONFIG_FILE);
            trace!("Looking for {:?}", candidate);
            if candidate.is_file() {
                debug!("Workspace root at {:?}", dir);
                return Ok(dir.to_path_buf());
            }
        }

        Err(ConfigError::RootNotFound {
            start,
            file: ROOT_CONFIG_FILE,
        })
    }

    /// Configuration file path for a workspace.
    pub fn config_path(&self, workspace_root: &Path) -> PathBuf {
        match self.config_file {
            Some(ref path) => path.clone(),
            None => workspace_root.join(ROOT_CONFIG_FILE),
        }
    }

    /// Load configuration for a workspace with optional CLI overrides.
    ///
    /// A missing `monodeps.toml` yields the defaults; a missing explicit file
    /// is an error. The result is validated after overrides are applied.
    pub fn load(
        &self,
        workspace_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<MonodepsConfig, ConfigError> {
        let path = self.config_path(workspace_root);

        let mut config = if self.config_file.is_some() || path.exists() {
            debug!("Loading config from {:?}", path);
            load_config_file(&path)?
        } else {
            trace!("Config not found at {:?}, using defaults", path);
            MonodepsConfig::default()
        };

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<MonodepsConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}
