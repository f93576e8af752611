//! Stagehand - Self-update pipeline for deployed applications.
//!
//! Stagehand checks a release endpoint for a newer version, downloads the
//! release archive (resuming interrupted transfers), extracts it into a
//! staging directory and merges selected subtrees into the running
//! installation while leaving local data alone.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, parsing, and validation
//! - [`error`] - Error types and result aliases
//! - [`events`] - Lifecycle events and sinks
//! - [`updates`] - The update pipeline and its stages
//!
//! # Example
//!
//! ```
//! use stagehand::config::UpdaterConfig;
//! use stagehand::updates::UpdatePipeline;
//!
//! let config = UpdaterConfig::new(
//!     "https://api.github.com/repos/acme/pos/releases/latest",
//!     "/srv/pos",
//! );
//! let pipeline = UpdatePipeline::new(config);
//! assert_eq!(
//!     pipeline.config().archive_path(),
//!     std::path::Path::new("/srv/pos/update_temp.zip")
//! );
//! ```
//!
//! For complete runs against a release server, see the integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod updates;

pub use error::{Result, StagehandError};
