//! Changeset queries
//!
//! Maps changed file paths to the targets that own them (the seeds), then adds
//! everything downstream of the seeds. The answer to "what do I need to
//! rebuild or retest?".

use std::collections::BTreeSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::graph::{DependencyGraph, GraphError};
use crate::target::TargetId;

/// Result of a changeset query. All sets are ordered by target id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangesetResult {
    /// Input paths, as given
    pub paths: Vec<String>,
    /// Targets owning at least one input path
    pub seeds: BTreeSet<TargetId>,
    /// Targets reached only through reverse dependencies
    pub dependents: BTreeSet<TargetId>,
    /// `seeds ∪ dependents`
    pub affected: BTreeSet<TargetId>,
    /// Input paths owned by no package
    pub unowned: Vec<String>,
}

impl ChangesetResult {
    /// Labels of the packages owning affected targets.
    pub fn affected_packages(&self) -> BTreeSet<String> {
        self.affected.iter().map(TargetId::package_label).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }
}

/// Targets affected by a change to `paths`.
///
/// Relative paths are taken relative to the workspace root. Paths outside
/// every package are recorded in [`ChangesetResult::unowned`], never an error.
pub fn query_changeset<I, P>(graph: &DependencyGraph, paths: I) -> ChangesetResult
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut result = ChangesetResult::default();

    for path in paths {
        let path = path.as_ref();
        let shown = path.to_string_lossy().into_owned();
        let owners = graph.resolver().path_to_targets(path);

        if owners.is_empty() {
            info!("{} is not owned by any package", shown);
            result.unowned.push(shown.clone());
        } else {
            debug!("{} -> {} targets", shown, owners.len());
            result.seeds.extend(owners.iter().cloned());
        }
        result.paths.push(shown);
    }

    let downstream = graph.downstream(&result.seeds);
    result.dependents = downstream.difference(&result.seeds).cloned().collect();
    result.affected = result.seeds.union(&downstream).cloned().collect();

    info!(
        "Changeset: {} paths, {} seeds, {} affected",
        result.paths.len(),
        result.seeds.len(),
        result.affected.len()
    );
    result
}

/// Everything downstream of a single target.
pub fn query_downstream(
    graph: &DependencyGraph,
    id: &TargetId,
) -> Result<BTreeSet<TargetId>, GraphError> {
    if !graph.contains(id) {
        return Err(GraphError::UnknownTarget(id.clone()));
    }
    Ok(graph.downstream(std::iter::once(id)))
}
