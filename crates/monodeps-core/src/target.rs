//! Target identity types
//!
//! Every node in the dependency graph is a [`Target`]: one build system's view
//! of one package directory. Three path-like notions are kept apart here:
//!
//! - [`PackagePath`]: a normalized, workspace-relative, `/`-separated directory.
//!   Never absolute, never contains `.`/`..` or empty components. The workspace
//!   root is the empty path.
//! - [`TargetId`]: `(PackagePath, BuildKind)`, written `//path:kind`.
//! - [`TargetLabel`]: what a user writes in a package marker, either a whole
//!   package (`//path`) or a single target (`//path:kind`).

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::manifest::DependencySpec;

/// Prefix of every label and target identifier.
pub const LABEL_PREFIX: &str = "//";

// ============================================================================
// Errors
// ============================================================================

/// Errors produced while building identity types from text or paths.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TargetError {
    /// Path is not a valid workspace-relative package path
    #[error("invalid package path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Label is not of the form `//path` or `//path:kind`
    #[error("invalid target label '{0}': expected //path or //path:kind")]
    InvalidLabel(String),

    /// Unknown build kind tag
    #[error("unknown build kind '{0}' (expected rust, python or generic)")]
    UnknownKind(String),
}

impl TargetError {
    fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Package Path
// ============================================================================

/// Workspace-relative directory of a package, always `/`-separated.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackagePath(String);

impl PackagePath {
    /// The workspace root.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Validate and wrap a `/`-separated relative path.
    pub fn new(path: impl Into<String>) -> Result<Self, TargetError> {
        let path = path.into();
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.starts_with('/') {
            return Err(TargetError::invalid_path(path, "must be relative"));
        }
        if path.contains('\\') {
            return Err(TargetError::invalid_path(path, "must use '/' separators"));
        }
        for component in path.split('/') {
            if component.is_empty() {
                return Err(TargetError::invalid_path(path, "empty path component"));
            }
            if component == "." || component == ".." {
                return Err(TargetError::invalid_path(
                    path,
                    "'.' and '..' are not allowed",
                ));
            }
        }
        Ok(Self(path))
    }

    /// Convert a host path relative to the workspace root.
    ///
    /// The path is lexically normalized first; returns `None` if it is
    /// absolute, escapes the root, or is not valid UTF-8.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut parts: Vec<String> = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(c) => parts.push(c.to_str()?.to_string()),
                Component::CurDir => {}
                Component::ParentDir => {
                    parts.pop()?;
                }
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(Self(parts.join("/")))
    }

    /// Resolve a `/`-separated path written relative to this package.
    ///
    /// Returns `None` if the result would leave the workspace or the input is
    /// absolute.
    pub fn join_relative(&self, rel: &str) -> Option<Self> {
        let rel = rel.replace('\\', "/");
        if rel.starts_with('/') || Path::new(&rel).is_absolute() {
            return None;
        }

        let mut parts: Vec<&str> = self.components().collect();
        for part in rel.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop()?;
                }
                other => parts.push(other),
            }
        }
        Some(Self(parts.join("/")))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path's components (empty for the root).
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    /// Parent directory, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Last path component, `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.components().last()
    }

    /// Package label, `//path` (the root is `//`).
    pub fn label(&self) -> String {
        format!("{}{}", LABEL_PREFIX, self.0)
    }

    /// Host path of this package below `workspace_root`.
    pub fn to_host_path(&self, workspace_root: &Path) -> PathBuf {
        let mut path = workspace_root.to_path_buf();
        for component in self.components() {
            path.push(component);
        }
        path
    }
}

impl fmt::Display for PackagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Build Kind
// ============================================================================

/// Build system that produced a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    /// Cargo crate (`Cargo.toml`)
    Rust,
    /// Python project (`requirements.txt`, `pyproject.toml`)
    Python,
    /// Bare package boundary without a recognized manifest
    Generic,
}

impl BuildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildKind::Rust => "rust",
            BuildKind::Python => "python",
            BuildKind::Generic => "generic",
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildKind {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rust" | "cargo" => Ok(BuildKind::Rust),
            "python" | "py" => Ok(BuildKind::Python),
            "generic" => Ok(BuildKind::Generic),
            _ => Err(TargetError::UnknownKind(s.to_string())),
        }
    }
}

// ============================================================================
// Target Identifier
// ============================================================================

/// Canonical identifier of a target: one per (directory, build kind).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId {
    pub package: PackagePath,
    pub kind: BuildKind,
}

impl TargetId {
    pub fn new(package: PackagePath, kind: BuildKind) -> Self {
        Self { package, kind }
    }

    /// Package label without the kind suffix.
    pub fn package_label(&self) -> String {
        self.package.label()
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package.label(), self.kind)
    }
}

impl FromStr for TargetId {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<TargetLabel>()? {
            TargetLabel::Target(id) => Ok(id),
            TargetLabel::Package(_) => Err(TargetError::InvalidLabel(s.to_string())),
        }
    }
}

impl Serialize for TargetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Target Label
// ============================================================================

/// A reference written by a user: a whole package or one of its targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetLabel {
    /// `//path` - every target inferred for the package
    Package(PackagePath),
    /// `//path:kind` - exactly one target
    Target(TargetId),
}

impl TargetLabel {
    pub fn package(&self) -> &PackagePath {
        match self {
            TargetLabel::Package(path) => path,
            TargetLabel::Target(id) => &id.package,
        }
    }
}

impl fmt::Display for TargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetLabel::Package(path) => write!(f, "{}", path.label()),
            TargetLabel::Target(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for TargetLabel {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .trim()
            .strip_prefix(LABEL_PREFIX)
            .ok_or_else(|| TargetError::InvalidLabel(s.to_string()))?;

        let (path, kind) = match rest.rsplit_once(':') {
            Some((path, kind)) => (path, Some(kind)),
            None => (rest, None),
        };
        let path = path.trim_end_matches('/');
        let package =
            PackagePath::new(path).map_err(|_| TargetError::InvalidLabel(s.to_string()))?;

        match kind {
            Some(kind) => Ok(TargetLabel::Target(TargetId::new(package, kind.parse()?))),
            None => Ok(TargetLabel::Package(package)),
        }
    }
}

impl<'de> Deserialize<'de> for TargetLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Target
// ============================================================================

/// A fully inferred target, as stored in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: TargetId,
    /// Package name declared by the manifest (`[package].name`, `[project].name`)
    pub name: Option<String>,
    /// Manifest file the target was inferred from, relative to the package
    pub manifest: Option<String>,
    /// Raw dependency specs, in manifest order
    pub specs: Vec<DependencySpec>,
    /// Dependencies declared explicitly in the package marker
    pub declared: Vec<TargetLabel>,
}

impl Target {
    pub fn package(&self) -> &PackagePath {
        &self.id.package
    }

    pub fn kind(&self) -> BuildKind {
        self.id.kind
    }
}

// ============================================================================
// Tests
// ============================================================================
