//! Cargo crates (`Cargo.toml`).

use crate::discovery::PackageListing;
use crate::manifest::{parse_cargo_toml, CARGO_MANIFEST};
use crate::marker::PackageMarker;
use crate::target::BuildKind;

use super::{InferenceOutcome, Inferrer, TargetDraft};

/// Recognizes packages with a `Cargo.toml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CargoInferrer;

impl CargoInferrer {
    pub fn new() -> Self {
        Self
    }
}

impl Inferrer for CargoInferrer {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn kind(&self) -> BuildKind {
        BuildKind::Rust
    }

    fn manifest_names(&self, _marker: &PackageMarker) -> Vec<String> {
        vec![CARGO_MANIFEST.to_string()]
    }

    fn classify(&self, listing: &PackageListing) -> InferenceOutcome {
        match listing.file(CARGO_MANIFEST) {
            None => InferenceOutcome::NotApplicable,
            Some(contents) => InferenceOutcome::Targets(vec![TargetDraft::from_parse(
                BuildKind::Rust,
                CARGO_MANIFEST,
                parse_cargo_toml(contents),
            )]),
        }
    }
}
