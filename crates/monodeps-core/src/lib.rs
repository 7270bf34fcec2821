//! monodeps core - package inference and dependency graphs for monorepos
//!
//! This crate provides the engine behind the `monodeps` CLI:
//! - Package discovery from boundary marker files
//! - Build system inference (Cargo, Python) with explicit conflict resolution
//! - Local dependency extraction from manifests
//! - A dependency graph with reverse-dependency (changeset) queries

pub mod builder;
pub mod changeset;
pub mod discovery;
pub mod graph;
pub mod infer;
pub mod manifest;
pub mod marker;
pub mod registry;
pub mod resolver;
pub mod target;

// Target re-exports
pub use target::{BuildKind, PackagePath, Target, TargetError, TargetId, TargetLabel};

// Builder re-exports
pub use builder::{build_graph, GraphBuilder, WorkspaceConfig};

// Graph re-exports
pub use graph::{
    DependencyEdge, DependencyGraph, EdgeExport, EdgeOrigin, GraphError, GraphExport, NodeExport,
    PackageWarning,
};

// Changeset re-exports
pub use changeset::{query_changeset, query_downstream, ChangesetResult};

// Inference re-exports
pub use infer::{
    CargoInferrer, InferenceError, InferenceOutcome, Inferrer, PythonInferrer, TargetDraft,
};
pub use registry::{aggregate, InferrerRegistry, PackageInference};

// Discovery re-exports
pub use discovery::{PackageListing, ScanConfig, ScanError, WorkspaceScanner};

// Manifest re-exports
pub use manifest::{DependencySpec, ParseError, SpecForm};
pub use marker::PackageMarker;
pub use resolver::{ResolveError, TargetResolver};
