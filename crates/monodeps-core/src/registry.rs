//! Inferrer Registry
//!
//! Runs every registered inferrer on every package and turns the outcomes
//! into target drafts. The decision for a single package lives in the pure
//! [`aggregate`] function; the registry only adds iteration and parallelism.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::discovery::PackageListing;
use crate::infer::{default_inferrers, InferenceError, InferenceOutcome, Inferrer, TargetDraft};
use crate::target::{BuildKind, PackagePath, TargetLabel};

/// Pseudo-inferrer blamed for malformed package markers.
pub const BOUNDARY_INFERRER: &str = "boundary";

/// Inference result for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInference {
    pub path: PackagePath,
    /// At least one draft, kinds pairwise distinct
    pub drafts: Vec<TargetDraft>,
    /// Dependencies declared in the package marker
    pub declared: Vec<TargetLabel>,
}

/// Decide what a package's inferrer outcomes mean.
///
/// - no `Targets` at all: a single generic target
/// - each `Targets` with exactly one draft, kinds distinct: all drafts
/// - anything else is ambiguous and fatal for the whole build
pub fn aggregate(
    package: &PackagePath,
    outcomes: Vec<(&str, InferenceOutcome)>,
) -> Result<Vec<TargetDraft>, InferenceError> {
    let mut drafts: Vec<(&str, TargetDraft)> = Vec::new();

    for (inferrer, outcome) in outcomes {
        match outcome {
            InferenceOutcome::NotApplicable => {}
            InferenceOutcome::Ambiguous { reason } => {
                return Err(InferenceError::ambiguous(package, inferrer, reason));
            }
            InferenceOutcome::Targets(mut candidates) => {
                if candidates.len() > 1 {
                    let manifests: Vec<&str> = candidates
                        .iter()
                        .filter_map(|d| d.manifest.as_deref())
                        .collect();
                    return Err(InferenceError::ambiguous(
                        package,
                        inferrer,
                        format!(
                            "found {} candidate manifests ({}); pin one in the package marker",
                            candidates.len(),
                            manifests.join(", ")
                        ),
                    ));
                }
                let Some(draft) = candidates.pop() else {
                    continue;
                };
                if let Some((other, _)) = drafts.iter().find(|(_, d)| d.kind == draft.kind) {
                    return Err(InferenceError::ambiguous(
                        package,
                        inferrer,
                        format!("kind '{}' is already inferred by '{}'", draft.kind, other),
                    ));
                }
                drafts.push((inferrer, draft));
            }
        }
    }

    if drafts.is_empty() {
        return Ok(vec![TargetDraft::generic()]);
    }
    Ok(drafts.into_iter().map(|(_, draft)| draft).collect())
}

// ============================================================================
// Registry
// ============================================================================

/// Ordered set of inferrers.
pub struct InferrerRegistry {
    inferrers: Vec<Box<dyn Inferrer>>,
}

impl Default for InferrerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl InferrerRegistry {
    /// An empty registry: every package becomes a generic target.
    pub fn new() -> Self {
        Self {
            inferrers: Vec::new(),
        }
    }

    /// Registry with the built-in Cargo and Python inferrers.
    pub fn with_defaults() -> Self {
        Self {
            inferrers: default_inferrers(),
        }
    }

    pub fn register(&mut self, inferrer: Box<dyn Inferrer>) {
        debug!("Registering inferrer '{}' ({})", inferrer.name(), inferrer.kind());
        self.inferrers.push(inferrer);
    }

    pub fn inferrers(&self) -> &[Box<dyn Inferrer>] {
        &self.inferrers
    }

    /// Kinds covered by the registered inferrers.
    pub fn kinds(&self) -> Vec<BuildKind> {
        self.inferrers.iter().map(|i| i.kind()).collect()
    }

    /// Infer the targets of one package.
    pub fn infer_package(
        &self,
        listing: &PackageListing,
    ) -> Result<PackageInference, InferenceError> {
        if let Some(err) = &listing.marker_error {
            return Err(InferenceError::ambiguous(
                &listing.path,
                BOUNDARY_INFERRER,
                format!("malformed package marker: {}", err),
            ));
        }

        let outcomes = self
            .inferrers
            .iter()
            .map(|inferrer| (inferrer.name(), inferrer.classify(listing)))
            .collect();
        let drafts = aggregate(&listing.path, outcomes)?;

        debug!(
            "Package {} -> [{}]",
            listing.path,
            drafts
                .iter()
                .map(|d| d.kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(PackageInference {
            path: listing.path.clone(),
            drafts,
            declared: listing.marker.deps.clone(),
        })
    }

    /// Infer every package in parallel.
    ///
    /// All packages are examined; the first error in listing order wins.
    pub fn infer_all(
        &self,
        listings: &[PackageListing],
    ) -> Result<Vec<PackageInference>, InferenceError> {
        let results: Vec<_> = listings
            .par_iter()
            .map(|listing| self.infer_package(listing))
            .collect();

        let inferences = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        info!(
            "Inferred {} targets in {} packages",
            inferences.iter().map(|p| p.drafts.len()).sum::<usize>(),
            inferences.len()
        );
        Ok(inferences)
    }
}
