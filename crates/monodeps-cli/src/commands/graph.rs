//! Graph command - print the dependency graph

use anyhow::Result;
use clap::{Args, ValueEnum};

use super::build_workspace_graph;
use crate::GlobalOptions;

/// Arguments for the graph command
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    format: GraphFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    /// One target per line with its dependencies indented below
    Text,
    /// Nodes and edges as JSON
    Json,
    /// Graphviz DOT
    Dot,
    /// Mermaid flowchart
    Mermaid,
}

/// Execute the graph command
pub fn execute(args: GraphArgs, global: GlobalOptions) -> Result<()> {
    let (_, graph) = build_workspace_graph(&global)?;

    let output = match args.format {
        GraphFormat::Text => graph.to_text(),
        GraphFormat::Json => serde_json::to_string_pretty(&graph.export())?,
        GraphFormat::Dot => graph.to_dot(),
        GraphFormat::Mermaid => graph.to_mermaid(),
    };

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
