//! Manifest Parsers
//!
//! Pure functions turning manifest contents into raw dependency specs. Parsers
//! never touch the filesystem and know nothing about the workspace layout:
//! they only report what a manifest says. Mapping specs to targets is the
//! resolver's job.
//!
//! ## Supported Manifest Files
//!
//! | Filename | Build kind | Parser |
//! |----------|------------|--------|
//! | Cargo.toml | rust | [`parse_cargo_toml`] |
//! | requirements*.txt | python | [`parse_requirements`] |
//! | pyproject.toml | python | [`parse_pyproject`] |

mod cargo;
mod pyproject;
mod requirements;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cargo::{parse_cargo_toml, CARGO_MANIFEST};
pub use pyproject::{parse_pyproject, PYPROJECT_MANIFEST};
pub use requirements::{parse_requirement_line, parse_requirements, DEFAULT_REQUIREMENTS};

// ============================================================================
// Errors
// ============================================================================

/// A recognized manifest that could not be parsed.
///
/// Never fatal: the owning target is still created, without manifest
/// dependencies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line of the offending input
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    /// Convert a TOML deserialization error, locating its span in `contents`.
    pub(crate) fn from_toml(contents: &str, err: &toml::de::Error) -> Self {
        let line = err
            .span()
            .map(|span| line_of_offset(contents, span.start))
            .unwrap_or(1);
        Self::new(line, err.message().trim().to_string())
    }
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of_offset(contents: &str, offset: usize) -> usize {
    let offset = offset.min(contents.len());
    contents.as_bytes()[..offset]
        .iter()
        .filter(|b| **b == b'\n')
        .count()
        + 1
}

// ============================================================================
// Dependency Specs
// ============================================================================

/// How a dependency refers to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecForm {
    /// Relative path from the declaring package (`path = "../core"`, `-e ../lib`)
    Path,
    /// Package name (`workspace = true`, `requests>=2`)
    Name,
}

impl SpecForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecForm::Path => "path",
            SpecForm::Name => "name",
        }
    }
}

/// One dependency as written in a manifest, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Path or name, verbatim for paths and normalized for Python names
    pub raw: String,
    pub form: SpecForm,
}

impl DependencySpec {
    pub fn path(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            form: SpecForm::Path,
        }
    }

    pub fn name(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            form: SpecForm::Name,
        }
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.form.as_str(), self.raw)
    }
}

/// Everything a parser extracts from one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedManifest {
    /// Declared package name, if the format has one
    pub name: Option<String>,
    pub specs: Vec<DependencySpec>,
}

impl ParsedManifest {
    pub(crate) fn push(&mut self, spec: DependencySpec) {
        if !self.specs.contains(&spec) {
            self.specs.push(spec);
        }
    }
}

// ============================================================================
// Name Normalization
// ============================================================================

static PEP503_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_.]+").unwrap());

/// Normalize a Python distribution name (PEP 503).
///
/// Lowercases and collapses runs of `-`, `_` and `.` into a single `-`.
pub fn normalize_python_name(name: &str) -> String {
    PEP503_SEPARATORS
        .replace_all(&name.trim().to_lowercase(), "-")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_python_name() {
        assert_eq!(normalize_python_name("Friendly-Bard"), "friendly-bard");
        assert_eq!(normalize_python_name("FRIENDLY.BARD"), "friendly-bard");
        assert_eq!(normalize_python_name("friendly__._bard"), "friendly-bard");
        assert_eq!(normalize_python_name("qsync_stream"), "qsync-stream");
    }

    #[test]
    fn test_line_of_offset() {
        let contents = "a\nb\nc";
        assert_eq!(line_of_offset(contents, 0), 1);
        assert_eq!(line_of_offset(contents, 2), 2);
        assert_eq!(line_of_offset(contents, 4), 3);
        assert_eq!(line_of_offset(contents, 100), 3);
    }

    #[test]
    fn test_parsed_manifest_dedupes() {
        let mut parsed = ParsedManifest::default();
        parsed.push(DependencySpec::path("../a"));
        parsed.push(DependencySpec::path("../a"));
        parsed.push(DependencySpec::name("a"));
        assert_eq!(parsed.specs.len(), 2);
    }
}
