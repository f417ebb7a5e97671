//! Command-line entry point wiring `args::Cli` to the core pipeline.

pub mod args;
pub mod commands;

use crate::config::Settings;
use args::{Cli, Commands};

pub async fn run(cli: Cli) -> i32 {
    let loaded = match cli.config.as_deref() {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = match loaded {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return 6;
        }
    };

    crate::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Index { .. } => commands::index::run(&settings, cli.json, cli.command).await,
        Commands::Search { .. } => commands::search::run(&settings, cli.json, cli.command).await,
        Commands::Serve { .. } => commands::serve::run(&settings, cli.command).await,
        Commands::Config { .. } => commands::config::run(&settings, cli.command),
    }
}
