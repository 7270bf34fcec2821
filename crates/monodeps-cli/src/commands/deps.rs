//! Deps command - dependencies or dependents of one target

use anyhow::{Context, Result};
use clap::Args;
use monodeps_core::TargetId;
use serde_json::json;

use super::{build_workspace_graph, print_info};
use crate::GlobalOptions;

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Target (`//path:kind`, or `//path` for single-target packages)
    target: String,

    /// Show reverse dependencies (what depends on this)
    #[arg(long, short = 'r')]
    reverse: bool,

    /// Follow dependencies transitively
    #[arg(long, short = 'a')]
    all: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the deps command
pub fn execute(args: DepsArgs, global: GlobalOptions) -> Result<()> {
    let (_, graph) = build_workspace_graph(&global)?;

    let id = graph
        .resolver()
        .parse_target(&args.target)
        .with_context(|| format!("Unknown target '{}'", args.target))?;

    let targets: Vec<TargetId> = match (args.reverse, args.all) {
        (false, false) => graph.upstream(&id)?,
        (true, false) => graph.dependents(&id)?,
        (false, true) => graph.dependencies_transitive(&id)?.into_iter().collect(),
        (true, true) => graph
            .downstream(std::iter::once(&id))
            .into_iter()
            .collect(),
    };

    if args.json {
        let output = json!({
            "target": id,
            "direction": if args.reverse { "dependents" } else { "dependencies" },
            "transitive": args.all,
            "targets": targets,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let relation = match (args.reverse, args.all) {
        (false, false) => "direct dependencies",
        (true, false) => "direct dependents",
        (false, true) => "transitive dependencies",
        (true, true) => "transitive dependents",
    };
    print_info(
        &format!("{} {} of {}:", targets.len(), relation, id),
        global.quiet,
    );
    for target in &targets {
        println!("{}", target);
    }

    Ok(())
}
