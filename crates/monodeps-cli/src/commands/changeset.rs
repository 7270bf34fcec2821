//! Changeset command - targets affected by changed files
//!
//! Paths come from the command line, from `git diff --name-only <ref>`, or
//! from stdin (whitespace separated). Stdin is read when neither paths nor
//! `--since` are given.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use clap::Args;
use monodeps_core::{query_changeset, ChangesetResult};
use serde::Serialize;

use super::{build_workspace_graph, print_info};
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct ChangesetArgs {
    /// Changed files, relative to the workspace root or absolute
    paths: Vec<PathBuf>,

    /// Add files changed since a git ref (e.g., main, HEAD~1)
    #[arg(long)]
    since: Option<String>,

    /// Read additional paths from stdin
    #[arg(long)]
    stdin: bool,

    /// Print affected packages instead of targets
    #[arg(long, short = 'p')]
    packages: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ChangesetOutput<'a> {
    #[serde(flatten)]
    result: &'a ChangesetResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<BTreeSet<String>>,
}

/// Execute the changeset command
pub fn execute(args: ChangesetArgs, global: GlobalOptions) -> Result<()> {
    let (workspace, graph) = build_workspace_graph(&global)?;

    let mut paths: Vec<PathBuf> = args.paths.clone();
    if let Some(ref since) = args.since {
        paths.extend(git_changed_files(&workspace, since)?);
    }
    if args.stdin || (args.paths.is_empty() && args.since.is_none()) {
        paths.extend(read_stdin_paths()?);
    }

    let result = query_changeset(&graph, &paths);
    if !result.unowned.is_empty() {
        print_info(
            &format!("{} paths outside every package", result.unowned.len()),
            global.quiet,
        );
    }

    if args.json {
        let output = ChangesetOutput {
            result: &result,
            packages: args.packages.then(|| result.affected_packages()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if args.packages {
        for package in result.affected_packages() {
            println!("{}", package);
        }
    } else {
        for id in &result.affected {
            println!("{}", id);
        }
    }

    Ok(())
}

/// Files changed since `since`, relative to the workspace root.
fn git_changed_files(workspace: &Path, since: &str) -> Result<Vec<PathBuf>> {
    let output = Command::new("git")
        .args(["diff", "--name-only", "--relative", since])
        .current_dir(workspace)
        .output()
        .context("Failed to run git diff")?;

    if !output.status.success() {
        anyhow::bail!(
            "git diff failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(PathBuf::from)
        .collect())
}

fn read_stdin_paths() -> Result<Vec<PathBuf>> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read paths from stdin")?;
    Ok(split_paths(&input))
}

fn split_paths(input: &str) -> Vec<PathBuf> {
    input.split_whitespace().map(PathBuf::from).collect()
}
