//! Tally - durable named counters with live WebSocket subscriptions.

mod actor;
mod channel;
mod cli;
mod config;
mod core;
mod logger;
mod rpc;
mod store;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{TallyConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = init_config(TallyConfig::load(&cli)?);

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(),
        Commands::Watch { name, url, .. } => {
            cli::watch::watch_counter(&config, name, url.as_deref())
        }
        Commands::Inspect { names, json } => cli::inspect::inspect_counters(&config, names, *json),
    }
}
