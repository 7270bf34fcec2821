//! Graph Builder
//!
//! Orchestrates a full build: scan, infer in parallel, then resolve and
//! validate serially into a [`DependencyGraph`].
//!
//! ## Usage
//!
//! ```ignore
//! use monodeps_core::builder::{GraphBuilder, WorkspaceConfig};
//! use std::path::Path;
//!
//! let builder = GraphBuilder::with_default_inferrers(WorkspaceConfig::default());
//! let graph = builder.build(Path::new("."))?;
//!
//! println!("{} targets, {} edges", graph.node_count(), graph.edge_count());
//! ```

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::discovery::{ScanConfig, WorkspaceScanner};
use crate::graph::{DependencyGraph, EdgeOrigin, GraphError, PackageWarning};
use crate::infer::{CargoInferrer, Inferrer, PythonInferrer};
use crate::manifest::DEFAULT_REQUIREMENTS;
use crate::marker::DEFAULT_MARKER;
use crate::registry::{InferrerRegistry, PackageInference};
use crate::resolver::TargetResolver;
use crate::target::{BuildKind, Target, TargetId};

// ============================================================================
// Configuration
// ============================================================================

/// Everything the library needs to know about a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    /// Package boundary marker file name
    pub marker: String,
    /// Glob patterns excluded from the walk
    pub exclude: Vec<String>,
    /// Honour `.gitignore` files
    pub respect_gitignore: bool,
    /// Requirements file names recognized by the Python inferrer
    pub python_requirements: Vec<String>,
    /// Build kinds whose inferrers are registered by default
    pub enabled: Vec<BuildKind>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            exclude: ScanConfig::default().exclude,
            respect_gitignore: true,
            python_requirements: vec![DEFAULT_REQUIREMENTS.to_string()],
            enabled: vec![BuildKind::Rust, BuildKind::Python],
        }
    }
}

impl WorkspaceConfig {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            marker: self.marker.clone(),
            exclude: self.exclude.clone(),
            respect_gitignore: self.respect_gitignore,
        }
    }
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Builds dependency graphs with an explicit set of inferrers.
pub struct GraphBuilder {
    config: WorkspaceConfig,
    registry: InferrerRegistry,
}

impl GraphBuilder {
    /// Builder with no inferrers: every package becomes a generic target.
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config,
            registry: InferrerRegistry::new(),
        }
    }

    /// Builder with the built-in inferrers enabled by `config`.
    pub fn with_default_inferrers(config: WorkspaceConfig) -> Self {
        let mut builder = Self::new(config);
        if builder.config.enabled.contains(&BuildKind::Rust) {
            builder.register(Box::new(CargoInferrer::new()));
        }
        if builder.config.enabled.contains(&BuildKind::Python) {
            let requirements = builder.config.python_requirements.clone();
            builder.register(Box::new(PythonInferrer::new(requirements)));
        }
        builder
    }

    pub fn register(&mut self, inferrer: Box<dyn Inferrer>) -> &mut Self {
        self.registry.register(inferrer);
        self
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Build the graph for the workspace at `root`.
    ///
    /// Fails without a partial graph on scan errors, ambiguous packages and
    /// unresolvable declared dependencies.
    pub fn build(&self, root: &Path) -> Result<DependencyGraph, GraphError> {
        let scanner = WorkspaceScanner::new(root, self.config.scan_config())?;
        let listings = scanner.scan(self.registry.inferrers())?;
        let inferences = self.registry.infer_all(&listings)?;

        let (targets, mut warnings) = materialize(inferences);
        let resolver = TargetResolver::new(scanner.root(), &targets);

        let mut edges: Vec<(TargetId, TargetId, EdgeOrigin)> = Vec::new();
        for target in &targets {
            for spec in &target.specs {
                match resolver.resolve_spec(&target.id, spec) {
                    Ok(ids) if ids.is_empty() => {
                        debug!("{}: {} is not in the workspace", target.id, spec);
                    }
                    Ok(ids) => {
                        for dep in ids {
                            let origin = EdgeOrigin::Manifest { spec: spec.clone() };
                            edges.push((target.id.clone(), dep, origin));
                        }
                    }
                    Err(e) => {
                        let warning = PackageWarning {
                            target: target.id.clone(),
                            manifest: target.manifest.clone(),
                            message: e.to_string(),
                        };
                        warn!("{}", warning);
                        warnings.push(warning);
                    }
                }
            }

            let mut seen = HashSet::new();
            for label in &target.declared {
                if !seen.insert(label) {
                    debug!("{}: {} declared more than once", target.id, label);
                    continue;
                }
                let ids = resolver.resolve_declared(label).map_err(|_| {
                    GraphError::UnresolvedDependency {
                        from: target.id.package_label(),
                        declared: label.to_string(),
                    }
                })?;
                if label.package() == &target.id.package {
                    let warning = PackageWarning {
                        target: target.id.clone(),
                        manifest: None,
                        message: format!("declared dependency {} is the package itself", label),
                    };
                    warn!("{}", warning);
                    warnings.push(warning);
                    continue;
                }
                for dep in ids {
                    edges.push((target.id.clone(), dep, EdgeOrigin::Declared));
                }
            }
        }

        let mut graph = DependencyGraph::with_targets(targets, resolver);
        for (from, to, origin) in edges {
            graph.add_dependency(&from, &to, origin)?;
        }
        for warning in warnings {
            graph.push_warning(warning);
        }

        for cycle in graph.cycles() {
            let members: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            warn!("Dependency cycle: {}", members.join(" -> "));
        }

        info!(
            "Built dependency graph: {} targets, {} edges, {} warnings",
            graph.node_count(),
            graph.edge_count(),
            graph.warnings().len()
        );
        Ok(graph)
    }
}

/// Turn inference drafts into targets, collecting parse warnings.
fn materialize(inferences: Vec<PackageInference>) -> (Vec<Target>, Vec<PackageWarning>) {
    let mut targets = Vec::new();
    let mut warnings = Vec::new();

    for inference in inferences {
        for draft in inference.drafts {
            let id = TargetId::new(inference.path.clone(), draft.kind);

            if let Some(err) = draft.warning {
                let warning = PackageWarning {
                    target: id.clone(),
                    manifest: draft.manifest.clone(),
                    message: format!("manifest ignored, {}", err),
                };
                warn!("{}", warning);
                warnings.push(warning);
            }

            targets.push(Target {
                id,
                name: draft.name,
                manifest: draft.manifest,
                specs: draft.specs,
                declared: inference.declared.clone(),
            });
        }
    }

    (targets, warnings)
}

/// Build a graph with the built-in inferrers enabled by `config`.
pub fn build_graph(root: &Path, config: &WorkspaceConfig) -> Result<DependencyGraph, GraphError> {
    GraphBuilder::with_default_inferrers(config.clone()).build(root)
}
