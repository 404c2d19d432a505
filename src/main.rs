//! mdpages - live preview for markdown + plantuml documentation trees.

mod builder;
mod cli;
mod config;
mod coordinator;
mod core;
mod deploy;
mod launch;
mod logger;
mod render;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PreviewConfig;

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

    let config = PreviewConfig::load(&cli)?;

    match &cli.command {
        Commands::Preview { .. } => cli::preview::preview(&config),
        Commands::Build => cli::build::build_tree(&config),
        Commands::Convert { manifest, publish } => {
            cli::convert::convert(&config, manifest.as_deref(), publish.as_deref())
        }
    }
}
