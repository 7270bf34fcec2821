//! Dependency Graph
//!
//! Petgraph-backed graph of targets. An edge `A -> B` means *A depends on B*,
//! so "downstream" of a change walks edges backwards.
//!
//! ## Structure
//!
//! ```text
//! DependencyGraph
//! ├── graph: Graph<Target, DependencyEdge>    arena of targets and edges
//! ├── node_lookup: TargetId -> NodeIndex
//! ├── resolver: TargetResolver                path <-> target mapping
//! └── warnings: Vec<PackageWarning>           non-fatal problems
//! ```
//!
//! The graph is read-only once built. Every traversal tracks visited nodes,
//! so cycles are safe.

use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Write as _};

use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent, EdgeRef, Reversed};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::discovery::ScanError;
use crate::infer::InferenceError;
use crate::manifest::DependencySpec;
use crate::resolver::TargetResolver;
use crate::target::{BuildKind, Target, TargetId};

// ============================================================================
// Errors and Warnings
// ============================================================================

/// Errors from building or querying a dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Walking or reading the workspace failed
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A package could not be classified without guessing
    #[error(transparent)]
    AmbiguousInference(#[from] InferenceError),

    /// A marker declares a dependency that inference did not produce
    #[error("{from} declares a dependency on {declared}, which is not an inferred target")]
    UnresolvedDependency { from: String, declared: String },

    /// Query for a target that is not in the graph
    #[error("unknown target: {0}")]
    UnknownTarget(TargetId),
}

/// A non-fatal problem found while building the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageWarning {
    pub target: TargetId,
    /// Manifest the problem was found in
    pub manifest: Option<String>,
    pub message: String,
}

impl fmt::Display for PackageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.manifest {
            Some(manifest) => write!(f, "{} ({}): {}", self.target, manifest, self.message),
            None => write!(f, "{}: {}", self.target, self.message),
        }
    }
}

// ============================================================================
// Edges
// ============================================================================

/// Why an edge exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum EdgeOrigin {
    /// Inferred from a manifest dependency
    Manifest { spec: DependencySpec },
    /// Declared in the package marker
    Declared,
}

/// Edge weight: every reason the dependency was recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyEdge {
    pub origins: Vec<EdgeOrigin>,
}

impl DependencyEdge {
    /// True when the edge only comes from marker declarations.
    pub fn is_declared_only(&self) -> bool {
        self.origins.iter().all(|o| *o == EdgeOrigin::Declared)
    }
}

// ============================================================================
// Export
// ============================================================================

/// Serializable snapshot of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeExport>,
    pub edges: Vec<EdgeExport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeExport {
    pub id: TargetId,
    /// Package label (`//path`)
    pub package: String,
    pub kind: BuildKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeExport {
    pub from: TargetId,
    pub to: TargetId,
    pub origins: Vec<EdgeOrigin>,
}

// ============================================================================
// Dependency Graph
// ============================================================================

/// All targets and dependency edges of one workspace snapshot.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: Graph<Target, DependencyEdge>,
    node_lookup: HashMap<TargetId, NodeIndex>,
    resolver: TargetResolver,
    warnings: Vec<PackageWarning>,
}

impl DependencyGraph {
    /// Create a graph holding `targets` and no edges.
    ///
    /// Targets are inserted in identifier order so iteration is stable.
    pub(crate) fn with_targets(mut targets: Vec<Target>, resolver: TargetResolver) -> Self {
        targets.sort_by(|a, b| a.id.cmp(&b.id));

        let mut graph = Graph::with_capacity(targets.len(), targets.len());
        let mut node_lookup = HashMap::with_capacity(targets.len());
        for target in targets {
            let id = target.id.clone();
            let idx = graph.add_node(target);
            node_lookup.insert(id, idx);
        }

        Self {
            graph,
            node_lookup,
            resolver,
            warnings: Vec::new(),
        }
    }

    /// Record `from depends on to`.
    ///
    /// Self references are dropped and duplicate edges merge their origins.
    /// Returns false if no new edge was created.
    pub(crate) fn add_dependency(
        &mut self,
        from: &TargetId,
        to: &TargetId,
        origin: EdgeOrigin,
    ) -> Result<bool, GraphError> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;

        if from_idx == to_idx {
            debug!("Dropping self reference on {}", from);
            return Ok(false);
        }

        if let Some(edge) = self.graph.find_edge(from_idx, to_idx) {
            if let Some(weight) = self.graph.edge_weight_mut(edge) {
                if !weight.origins.contains(&origin) {
                    weight.origins.push(origin);
                }
            }
            return Ok(false);
        }

        self.graph.add_edge(
            from_idx,
            to_idx,
            DependencyEdge {
                origins: vec![origin],
            },
        );
        Ok(true)
    }

    pub(crate) fn push_warning(&mut self, warning: PackageWarning) {
        self.warnings.push(warning);
    }

    fn index_of(&self, id: &TargetId) -> Result<NodeIndex, GraphError> {
        self.node_lookup
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownTarget(id.clone()))
    }

    fn id_at(&self, idx: NodeIndex) -> &TargetId {
        &self.graph[idx].id
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &TargetId) -> bool {
        self.node_lookup.contains_key(id)
    }

    pub fn target(&self, id: &TargetId) -> Option<&Target> {
        self.node_lookup.get(id).map(|idx| &self.graph[*idx])
    }

    /// All targets in identifier order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.graph.node_weights()
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Non-fatal problems found while building.
    pub fn warnings(&self) -> &[PackageWarning] {
        &self.warnings
    }

    /// Every edge as `(from, to, weight)`, sorted by endpoints.
    pub fn edges(&self) -> Vec<(&TargetId, &TargetId, &DependencyEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (self.id_at(e.source()), self.id_at(e.target()), e.weight()))
            .collect();
        edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        edges
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Direct dependencies of a target.
    pub fn upstream(&self, id: &TargetId) -> Result<Vec<TargetId>, GraphError> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Targets depending directly on a target.
    pub fn dependents(&self, id: &TargetId) -> Result<Vec<TargetId>, GraphError> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &TargetId, direction: Direction) -> Result<Vec<TargetId>, GraphError> {
        let idx = self.index_of(id)?;
        let mut ids: Vec<TargetId> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.id_at(n).clone())
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// Everything that depends on any seed, transitively.
    ///
    /// Seeds are not part of the result unless a cycle leads back to them.
    /// Unknown seeds are ignored.
    pub fn downstream<'a>(&self, seeds: impl IntoIterator<Item = &'a TargetId>) -> BTreeSet<TargetId> {
        self.closure(seeds, Direction::Incoming)
    }

    /// Everything a target depends on, transitively.
    pub fn dependencies_transitive(&self, id: &TargetId) -> Result<BTreeSet<TargetId>, GraphError> {
        self.index_of(id)?;
        Ok(self.closure(std::iter::once(id), Direction::Outgoing))
    }

    /// Reachability from the neighbors of `seeds` in `direction`.
    fn closure<'a>(
        &self,
        seeds: impl IntoIterator<Item = &'a TargetId>,
        direction: Direction,
    ) -> BTreeSet<TargetId> {
        let starts: Vec<NodeIndex> = seeds
            .into_iter()
            .filter_map(|id| self.node_lookup.get(id))
            .flat_map(|idx| self.graph.neighbors_directed(*idx, direction))
            .collect();

        let mut visited = BTreeSet::new();
        let visitor = |event: DfsEvent<NodeIndex>| {
            if let DfsEvent::Discover(n, _) = event {
                visited.insert(self.id_at(n).clone());
            }
        };

        match direction {
            Direction::Outgoing => depth_first_search(&self.graph, starts, visitor),
            Direction::Incoming => depth_first_search(Reversed(&self.graph), starts, visitor),
        };

        visited
    }

    /// Strongly connected components with more than one target.
    ///
    /// Each cycle is sorted, and cycles are ordered by their first member.
    pub fn cycles(&self) -> Vec<Vec<TargetId>> {
        let mut cycles: Vec<Vec<TargetId>> = petgraph::algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut ids: Vec<TargetId> = scc.into_iter().map(|n| self.id_at(n).clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    // ------------------------------------------------------------------------
    // Export and rendering
    // ------------------------------------------------------------------------

    /// Serializable snapshot; equal for equal workspaces.
    pub fn export(&self) -> GraphExport {
        let nodes = self
            .targets()
            .map(|t| NodeExport {
                id: t.id.clone(),
                package: t.id.package_label(),
                kind: t.kind(),
                name: t.name.clone(),
                manifest: t.manifest.clone(),
            })
            .collect();

        let edges = self
            .edges()
            .into_iter()
            .map(|(from, to, edge)| EdgeExport {
                from: from.clone(),
                to: to.clone(),
                origins: edge.origins.clone(),
            })
            .collect();

        GraphExport { nodes, edges }
    }

    /// Plain text adjacency list: each target followed by its dependencies.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for target in self.targets() {
            let _ = writeln!(out, "{}", target.id);
            if let Ok(deps) = self.upstream(&target.id) {
                for dep in deps {
                    let _ = writeln!(out, "  -> {}", dep);
                }
            }
        }
        out
    }

    /// Graphviz DOT. Edges that only come from marker declarations are dashed.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph monodeps {\n  rankdir=LR;\n  node [shape=box];\n");
        for target in self.targets() {
            let _ = writeln!(out, "  \"{}\";", dot_escape(&target.id));
        }
        for (from, to, edge) in self.edges() {
            let style = if edge.is_declared_only() {
                " [style=dashed]"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\"{};",
                dot_escape(from),
                dot_escape(to),
                style
            );
        }
        out.push_str("}\n");
        out
    }

    /// Mermaid flowchart.
    pub fn to_mermaid(&self) -> String {
        let ids: HashMap<&TargetId, usize> = self
            .targets()
            .enumerate()
            .map(|(i, t)| (&t.id, i))
            .collect();

        let mut out = String::from("graph LR\n");
        for (i, target) in self.targets().enumerate() {
            let _ = writeln!(out, "  n{}[\"{}\"]", i, mermaid_escape(&target.id));
        }
        for (from, to, edge) in self.edges() {
            let arrow = if edge.is_declared_only() { "-.->" } else { "-->" };
            let _ = writeln!(out, "  n{} {} n{}", ids[from], arrow, ids[to]);
        }
        out
    }
}

/// Quoted DOT ids only treat `"` and `\` specially.
fn dot_escape(id: &TargetId) -> String {
    id.to_string().replace('\\', "\\\\").replace('"', "\\\"")
}

/// Mermaid labels take HTML entity codes.
fn mermaid_escape(id: &TargetId) -> String {
    id.to_string().replace('"', "#quot;")
}
