//! monodeps CLI - dependency graphs and changesets for polyglot monorepos
//!
//! # Usage
//!
//! ```bash
//! # Print the dependency graph
//! monodeps graph --format dot
//!
//! # Targets affected by a change
//! monodeps changeset libs/core/src/lib.rs
//! git diff --name-only main | monodeps changeset
//! monodeps changeset --since main --packages
//!
//! # Direct or transitive dependencies of a target
//! monodeps deps //apps/server:rust --all
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;
mod progress;

/// monodeps - package inference and reverse-dependency queries for monorepos
#[derive(Parser, Debug)]
#[command(name = "monodeps")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Workspace root (default: nearest directory with monodeps.toml)
    #[arg(long, short = 'w', global = true, env = "MONODEPS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "MONODEPS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Package marker file name
    #[arg(long, global = true)]
    marker: Option<String>,

    /// Additional glob patterns to exclude from package discovery
    #[arg(long, global = true)]
    exclude: Vec<String>,

    /// Do not honour .gitignore files
    #[arg(long, global = true)]
    no_gitignore: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> monodeps_config::ConfigOverrides {
        monodeps_config::ConfigOverrides {
            marker: self.marker.clone(),
            exclude: self.exclude.clone(),
            respect_gitignore: self.no_gitignore.then_some(false),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the workspace dependency graph
    Graph(commands::graph::GraphArgs),

    /// Show targets affected by changed files
    Changeset(commands::changeset::ChangesetArgs),

    /// Show dependencies or dependents of a target
    Deps(commands::deps::DepsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = if cli.global.quiet {
        Level::ERROR
    } else if cli.global.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    match cli.command {
        Commands::Graph(args) => commands::graph::execute(args, cli.global),
        Commands::Changeset(args) => commands::changeset::execute(args, cli.global),
        Commands::Deps(args) => commands::deps::execute(args, cli.global),
    }
}
