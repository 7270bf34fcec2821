//! Package Inferrers
//!
//! An inferrer looks at one package directory and decides whether its build
//! system applies there. Inferrers are pure: the scanner reads every file they
//! ask for up front, so `classify` only sees a [`PackageListing`].
//!
//! ## Outcomes
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `NotApplicable` | No manifest for this build system |
//! | `Targets(drafts)` | One draft per recognized manifest |
//! | `Ambiguous { reason }` | The inferrer cannot decide (fatal) |
//!
//! Deciding what several outcomes mean for a package is the registry's job,
//! see [`crate::registry::aggregate`].

mod cargo;
mod python;

use thiserror::Error;

use crate::discovery::PackageListing;
use crate::manifest::{DependencySpec, ParseError, ParsedManifest};
use crate::marker::PackageMarker;
use crate::target::{BuildKind, PackagePath};

pub use cargo::CargoInferrer;
pub use python::PythonInferrer;

// ============================================================================
// Errors
// ============================================================================

/// Fatal inference failure for one package.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// The package cannot be classified without guessing
    #[error("ambiguous package {package} ({inferrer}): {reason}")]
    Ambiguous {
        package: PackagePath,
        inferrer: String,
        reason: String,
    },
}

impl InferenceError {
    pub fn ambiguous(
        package: &PackagePath,
        inferrer: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Ambiguous {
            package: package.clone(),
            inferrer: inferrer.into(),
            reason: reason.into(),
        }
    }

    pub fn package(&self) -> &PackagePath {
        match self {
            InferenceError::Ambiguous { package, .. } => package,
        }
    }
}

// ============================================================================
// Drafts and Outcomes
// ============================================================================

/// A target as proposed by one inferrer, before identity and edges exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDraft {
    pub kind: BuildKind,
    /// Manifest file name the draft came from (`None` for generic targets)
    pub manifest: Option<String>,
    /// Declared package name
    pub name: Option<String>,
    pub specs: Vec<DependencySpec>,
    /// Set when the manifest was recognized but could not be parsed
    pub warning: Option<ParseError>,
}

impl TargetDraft {
    /// Draft for a package without a recognized manifest.
    pub fn generic() -> Self {
        Self {
            kind: BuildKind::Generic,
            manifest: None,
            name: None,
            specs: Vec::new(),
            warning: None,
        }
    }

    /// Draft from a manifest parse result.
    ///
    /// A parse failure still yields a draft: the manifest is recognized, it
    /// just contributes no dependencies.
    pub fn from_parse(
        kind: BuildKind,
        manifest: &str,
        result: Result<ParsedManifest, ParseError>,
    ) -> Self {
        let (parsed, warning) = match result {
            Ok(parsed) => (parsed, None),
            Err(e) => (ParsedManifest::default(), Some(e)),
        };
        Self {
            kind,
            manifest: Some(manifest.to_string()),
            name: parsed.name,
            specs: parsed.specs,
            warning,
        }
    }
}

/// Result of running one inferrer on one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    NotApplicable,
    Targets(Vec<TargetDraft>),
    Ambiguous { reason: String },
}

impl InferenceOutcome {
    pub fn ambiguous(reason: impl Into<String>) -> Self {
        Self::Ambiguous {
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Inferrer Trait
// ============================================================================

/// A build system that can classify package directories.
pub trait Inferrer: Send + Sync {
    /// Stable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Kind of the targets this inferrer produces.
    fn kind(&self) -> BuildKind;

    /// Files the scanner must read for this package, relative to it.
    fn manifest_names(&self, marker: &PackageMarker) -> Vec<String>;

    /// Classify a package from its already-read files.
    fn classify(&self, listing: &PackageListing) -> InferenceOutcome;
}

/// The built-in inferrers, in registration order.
pub fn default_inferrers() -> Vec<Box<dyn Inferrer>> {
    vec![
        Box::new(CargoInferrer::new()),
        Box::new(PythonInferrer::default()),
    ]
}
