//! Configuration loading and validation for Stagehand.
//!
//! - Schema definitions in [`schema`]
//! - File loading and validation in [`loader`]
//!
//! # Example
//!
//! ```
//! use stagehand::config::{load_config, UpdaterConfig};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("stagehand.yml");
//! fs::write(
//!     &path,
//!     "metadata_url: https://api.github.com/repos/acme/pos/releases/latest\ninstall_root: app\n",
//! )
//! .unwrap();
//!
//! let config = load_config(&path).unwrap();
//! assert_eq!(config.install_root, temp.path().join("app"));
//! assert_eq!(config.subtrees_to_merge, vec!["dist", "server"]);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_file, parse_config, validate, DEFAULT_CONFIG_FILE};
pub use schema::{github_latest_release_url, UpdaterConfig};
