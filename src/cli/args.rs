//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Live preview for markdown + plantuml documentation trees
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Source directory path (relative to project root)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub source: Option<PathBuf>,

    /// Config file path (default: mdpages.toml)
    #[arg(short = 'C', long, default_value = "mdpages.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build every page, open them, and rebuild on change
    #[command(visible_alias = "p")]
    Preview {
        #[command(flatten)]
        args: PreviewArgs,
    },

    /// Build every page once
    #[command(visible_alias = "b")]
    Build,

    /// Convert every page for publishing and write a manifest
    #[command(visible_alias = "c")]
    Convert {
        /// Manifest path (default: <output>/pages.json)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        manifest: Option<PathBuf>,

        /// Publish changed pages into this directory
        #[arg(long, value_hint = clap::ValueHint::DirPath)]
        publish: Option<PathBuf>,
    },
}

/// Preview command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct PreviewArgs {
    /// Port of the static preview server
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Port of the live-reload WebSocket
    #[arg(short, long)]
    pub reload_port: Option<u16>,

    /// Do not open pages in the browser
    #[arg(long)]
    pub no_open: bool,
}
