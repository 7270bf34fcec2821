//! Common test utilities for monodeps-core integration tests.
//!
//! Provides a temporary workspace builder and access to the checked-in
//! fixture workspaces.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use monodeps_core::{build_graph, DependencyGraph, GraphError, TargetId, WorkspaceConfig};

/// Path to a fixture workspace under `tests/fixtures`.
pub fn fixture_dir(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Build a fixture workspace with the default configuration.
pub fn build_fixture(name: &str) -> DependencyGraph {
    let root = fixture_dir(name);
    assert!(root.exists(), "Fixture directory does not exist: {:?}", root);
    build_graph(&root, &WorkspaceConfig::default()).expect("Failed to build fixture graph")
}

/// A workspace in a temporary directory, populated file by file.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(dir.path().join("monodeps.toml"), "").expect("Failed to write root config");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create directories");
        }
        fs::write(&path, contents).expect("Failed to write file");
        self
    }

    /// Mark `rel` as a package with an empty marker.
    pub fn package(self, rel: &str) -> Self {
        self.file(&format!("{}/package.toml", rel), "")
    }

    pub fn try_build(&self) -> Result<DependencyGraph, GraphError> {
        build_graph(self.root(), &WorkspaceConfig::default())
    }

    pub fn build(&self) -> DependencyGraph {
        self.try_build().expect("Failed to build graph")
    }
}

/// Parse a `//path:kind` identifier.
pub fn id(s: &str) -> TargetId {
    s.parse().expect("invalid target id")
}

/// Set of target ids from their text form.
pub fn ids(list: &[&str]) -> BTreeSet<TargetId> {
    list.iter().map(|s| id(s)).collect()
}

/// All target ids of a graph, as strings.
pub fn target_strings(graph: &DependencyGraph) -> Vec<String> {
    graph.targets().map(|t| t.id.to_string()).collect()
}

/// All edges of a graph as `from -> to` strings.
pub fn edge_strings(graph: &DependencyGraph) -> Vec<String> {
    graph
        .edges()
        .into_iter()
        .map(|(from, to, _)| format!("{} -> {}", from, to))
        .collect()
}
