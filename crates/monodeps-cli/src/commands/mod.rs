//! CLI command implementations

pub mod changeset;
pub mod deps;
pub mod graph;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use monodeps_config::{ConfigLoader, MonodepsConfig};
use monodeps_core::{DependencyGraph, GraphBuilder, ScanConfig, WorkspaceConfig};

use crate::progress;
use crate::GlobalOptions;

/// Resolve the workspace root.
///
/// An explicit `--workspace` is used as given; otherwise the nearest
/// directory above the current one holding `monodeps.toml`.
pub fn resolve_workspace(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref ws) = global.workspace {
        return ws
            .canonicalize()
            .with_context(|| format!("Workspace '{}' does not exist", ws.display()));
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    ConfigLoader::locate_root(&cwd).context("Failed to locate workspace root")
}

/// Load configuration with optional config file override.
pub fn load_config(global: &GlobalOptions, workspace: &Path) -> Result<MonodepsConfig> {
    let loader = match global.config {
        Some(ref path) => ConfigLoader::with_config_file(path),
        None => ConfigLoader::new(),
    };

    loader
        .load(workspace, Some(&global.to_config_overrides()))
        .context("Failed to load configuration")
}

/// Translate the file configuration into the graph builder's.
pub fn to_workspace_config(config: &MonodepsConfig) -> Result<WorkspaceConfig> {
    let mut exclude = ScanConfig::default().exclude;
    exclude.extend(config.packages.exclude.iter().cloned());

    let enabled = config
        .inference
        .kinds()
        .context("Invalid inference.enabled")?;

    Ok(WorkspaceConfig {
        marker: config.packages.marker.clone(),
        exclude,
        respect_gitignore: config.packages.respect_gitignore,
        python_requirements: config.python.requirements.clone(),
        enabled,
    })
}

/// Locate the workspace, load its configuration and build the graph.
pub fn build_workspace_graph(global: &GlobalOptions) -> Result<(PathBuf, DependencyGraph)> {
    let workspace = resolve_workspace(global)?;
    let config = load_config(global, &workspace)?;
    let builder = GraphBuilder::with_default_inferrers(to_workspace_config(&config)?);

    let spinner = progress::spinner("Building dependency graph...", global.quiet);
    let graph = match builder.build(&workspace) {
        Ok(graph) => graph,
        Err(e) => {
            progress::finish_spinner_error(spinner, "Failed to build dependency graph");
            return Err(e).context("Failed to build dependency graph");
        }
    };

    let summary = format!(
        "{} targets, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    if graph.warnings().is_empty() {
        progress::finish_spinner(spinner, &summary);
    } else {
        progress::finish_spinner_warn(
            spinner,
            &format!("{} ({} warnings)", summary, graph.warnings().len()),
        );
    }

    Ok((workspace, graph))
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monodeps_core::BuildKind;

    #[test]
    fn test_to_workspace_config_defaults() {
        let config = to_workspace_config(&MonodepsConfig::default()).unwrap();
        assert_eq!(config.marker, "package.toml");
        assert_eq!(config.enabled, vec![BuildKind::Rust, BuildKind::Python]);
        assert_eq!(config.exclude, ScanConfig::default().exclude);
    }

    #[test]
    fn test_to_workspace_config_extends_excludes() {
        let mut file = MonodepsConfig::default();
        file.packages.exclude.push("gen/**".to_string());
        file.inference.enabled = vec!["py".to_string()];

        let config = to_workspace_config(&file).unwrap();
        assert_eq!(config.exclude.last().map(String::as_str), Some("gen/**"));
        assert_eq!(config.enabled, vec![BuildKind::Python]);
    }
}
