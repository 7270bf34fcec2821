//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating or loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// No directory from the start upwards holds the root file
    #[error("no {file} found in '{start}' or any parent directory")]
    RootNotFound { start: PathBuf, file: &'static str },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    /// Create a new ReadFile error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a new ParseToml error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Create a new InvalidValue error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::invalid_value("packages.marker", "must be a file name");
        assert!(err.to_string().contains("packages.marker"));
        assert!(err.to_string().contains("must be a file name"));
    }

    #[test]
    fn test_root_not_found_display() {
        let err = ConfigError::RootNotFound {
            start: PathBuf::from("/tmp/somewhere"),
            file: "monodeps.toml",
        };
        assert_eq!(
            err.to_string(),
            "no monodeps.toml found in '/tmp/somewhere' or any parent directory"
        );
    }
}
