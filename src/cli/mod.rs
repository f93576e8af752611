//! Command-line interface for Stagehand.
//!
//! This module provides the CLI argument parsing using clap's derive macros
//! and command implementations.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations
//! - [`output`] - Console and JSON rendering of lifecycle events

pub mod args;
pub mod commands;
pub mod output;

pub use args::{CheckArgs, Cli, Commands, UpdateArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
pub use output::{ConsoleSink, JsonLinesSink, Theme};
