//! Command-line argument surface (spec.md §1 — thin collaborator, not
//! designed in depth; kept simple and delegating to the core entry points).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "codeatlas", version, about = "Parse, map, and index source repositories into a queryable code knowledge graph")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a codeatlas.toml config file, overriding auto-discovery.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON envelopes instead of human-readable tables.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan, parse, map, and index a repository path.
    Index {
        /// Repository root directory.
        path: PathBuf,
        /// Name to register the repository under (defaults to the directory name).
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        commit: Option<String>,
        /// Skip files whose (path, checksum) already exist in the store.
        #[arg(long, default_value_t = true)]
        incremental: bool,
        /// Do not request embeddings for this run.
        #[arg(long)]
        skip_vectors: bool,
        #[arg(long)]
        no_ignore: bool,
    },
    /// Run a semantic search against an indexed repository.
    Search {
        query: String,
        #[arg(long)]
        repo: Option<String>,
        #[arg(long)]
        language: Option<String>,
        #[arg(long = "kind")]
        kinds: Vec<String>,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Run the HTTP surface (requires the `http-server` feature).
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print or initialize the effective configuration.
    Config {
        /// Write a default codeatlas.toml to the current directory.
        #[arg(long)]
        init: bool,
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_well_formed() {
        Cli::command().debug_assert();
    }
}
