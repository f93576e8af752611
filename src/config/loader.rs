//! Configuration file loading and validation.
//!
//! Relative paths in a config file are resolved against the directory
//! containing that file, so a config can travel with its installation.

use crate::config::schema::UpdaterConfig;
use crate::error::{Result, StagehandError};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "stagehand.yml";

/// Load a single config file and parse it into [`UpdaterConfig`].
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<UpdaterConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StagehandError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StagehandError::Io(e)
        }
    })?;

    let mut config = parse_config(&content, path)?;
    if let Some(base) = path.parent() {
        resolve_relative_paths(&mut config, base);
    }
    Ok(config)
}

/// Parse YAML content into [`UpdaterConfig`].
///
/// # Arguments
///
/// * `content` - The YAML content to parse
/// * `source_path` - Path for error reporting
pub fn parse_config(content: &str, source_path: &Path) -> Result<UpdaterConfig> {
    serde_yaml::from_str(content).map_err(|e| StagehandError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<UpdaterConfig> {
    let config = load_config_file(path)?;
    validate(&config)?;
    Ok(config)
}

fn resolve_relative_paths(config: &mut UpdaterConfig, base: &Path) {
    let resolve = |p: &Path| -> PathBuf {
        if p.is_relative() {
            base.join(p)
        } else {
            p.to_path_buf()
        }
    };

    config.install_root = resolve(&config.install_root);
    config.archive_path = config.archive_path.as_deref().map(resolve);
    config.staging_dir = config.staging_dir.as_deref().map(resolve);
}

/// Validate a configuration before a run.
///
/// # Errors
///
/// Returns `ConfigValidationError` describing the first problem found.
pub fn validate(config: &UpdaterConfig) -> Result<()> {
    if config.metadata_url.trim().is_empty() {
        return Err(invalid("metadata_url must not be empty"));
    }

    if config.subtrees_to_merge.is_empty() {
        return Err(invalid("subtrees_to_merge must name at least one directory"));
    }

    for name in &config.subtrees_to_merge {
        check_plain_name("subtrees_to_merge", name)?;
    }

    for name in &config.excluded_names {
        check_plain_name("excluded_names", name)?;
    }

    if config.check_timeout_secs == 0 {
        return Err(invalid("check_timeout_secs must be greater than zero"));
    }

    let staging = config.staging_dir();
    if staging == config.install_root || config.install_root.starts_with(&staging) {
        return Err(invalid(format!(
            "staging_dir {} must not contain the install root",
            staging.display()
        )));
    }

    let archive = config.archive_path();
    if archive.starts_with(&staging) {
        return Err(invalid(format!(
            "archive_path {} must not be inside staging_dir {}",
            archive.display(),
            staging.display()
        )));
    }

    Ok(())
}

fn check_plain_name(field: &str, name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if name.is_empty() || !plain || name.contains(['/', '\\']) {
        return Err(invalid(format!(
            "{} entry '{}' must be a single file or directory name",
            field, name
        )));
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> StagehandError {
    StagehandError::ConfigValidationError {
        message: message.into(),
    }
}
