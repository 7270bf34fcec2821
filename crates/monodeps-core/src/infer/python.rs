//! Python projects (`requirements.txt`, `pyproject.toml`).

use crate::discovery::PackageListing;
use crate::manifest::{parse_pyproject, parse_requirements, DEFAULT_REQUIREMENTS, PYPROJECT_MANIFEST};
use crate::marker::PackageMarker;
use crate::target::BuildKind;

use super::{InferenceOutcome, Inferrer, TargetDraft};

/// Recognizes Python packages.
///
/// Candidates are the configured requirements file names followed by
/// `pyproject.toml`. A package with more than one candidate present must pin
/// one in its marker (`[python] manifest = "..."`), otherwise every candidate
/// becomes a draft and the registry rejects the package as ambiguous.
#[derive(Debug, Clone)]
pub struct PythonInferrer {
    requirements: Vec<String>,
}

impl Default for PythonInferrer {
    fn default() -> Self {
        Self::new(vec![DEFAULT_REQUIREMENTS.to_string()])
    }
}

impl PythonInferrer {
    /// Create an inferrer recognizing the given requirements file names.
    pub fn new(requirements: Vec<String>) -> Self {
        Self { requirements }
    }

    fn candidates(&self) -> impl Iterator<Item = &str> {
        self.requirements
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(PYPROJECT_MANIFEST))
    }

    fn draft(manifest: &str, contents: &str) -> TargetDraft {
        let result = if manifest.ends_with(".toml") {
            parse_pyproject(contents)
        } else {
            parse_requirements(contents)
        };
        TargetDraft::from_parse(BuildKind::Python, manifest, result)
    }
}

impl Inferrer for PythonInferrer {
    fn name(&self) -> &'static str {
        "python"
    }

    fn kind(&self) -> BuildKind {
        BuildKind::Python
    }

    fn manifest_names(&self, marker: &PackageMarker) -> Vec<String> {
        match marker.python_manifest() {
            Some(pinned) => vec![pinned.to_string()],
            None => self.candidates().map(str::to_string).collect(),
        }
    }

    fn classify(&self, listing: &PackageListing) -> InferenceOutcome {
        if let Some(pinned) = listing.marker.python_manifest() {
            return match listing.file(pinned) {
                Some(contents) => InferenceOutcome::Targets(vec![Self::draft(pinned, contents)]),
                None => InferenceOutcome::ambiguous(format!(
                    "pinned python manifest '{}' does not exist",
                    pinned
                )),
            };
        }

        let drafts: Vec<TargetDraft> = self
            .candidates()
            .filter_map(|name| listing.file(name).map(|contents| Self::draft(name, contents)))
            .collect();

        if drafts.is_empty() {
            InferenceOutcome::NotApplicable
        } else {
            InferenceOutcome::Targets(drafts)
        }
    }
}
