//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

/// Stagehand - Self-update pipeline for deployed applications.
#[derive(Debug, Parser)]
#[command(name = "stagehand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check whether a newer release is published
    Check(CheckArgs),

    /// Download and install the latest release
    Update(UpdateArgs),
}

/// Arguments for the `check` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CheckArgs {
    /// Version of the running installation
    #[arg(long, value_name = "VERSION", env = "STAGEHAND_CURRENT_VERSION")]
    pub current_version: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `update` command.
#[derive(Debug, Clone, clap::Args)]
pub struct UpdateArgs {
    /// Version of the running installation
    #[arg(long, value_name = "VERSION", env = "STAGEHAND_CURRENT_VERSION")]
    pub current_version: String,

    /// Emit one JSON event per line, then the outcome
    #[arg(long)]
    pub json: bool,
}
