//! Updater configuration schema.
//!
//! Every path and list the pipeline touches is supplied here explicitly;
//! nothing is derived from the running executable's location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::updates::ApplyPlan;

/// File name of the downloaded archive inside the install root.
pub const DEFAULT_ARCHIVE_NAME: &str = "update_temp.zip";

/// Directory name of the staging area next to the install root.
pub const DEFAULT_STAGING_NAME: &str = "update_staging";

/// Default metadata request timeout in seconds.
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 5;

/// Build the GitHub "latest release" endpoint for `owner/repo`.
pub fn github_latest_release_url(repository: &str) -> String {
    format!(
        "https://api.github.com/repos/{}/releases/latest",
        repository.trim_matches('/')
    )
}

/// Static configuration for one updater installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Release metadata endpoint returning `tag_name` and `zipball_url`.
    pub metadata_url: String,

    /// Root of the live installation the update is merged into.
    pub install_root: PathBuf,

    /// Where the release archive is downloaded (and resumed).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<PathBuf>,

    /// Disposable extraction directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    /// Top-level directories of the release copied into the installation.
    #[serde(default = "default_subtrees")]
    pub subtrees_to_merge: Vec<String>,

    /// File and directory names that are never overwritten.
    #[serde(default = "default_excluded_names")]
    pub excluded_names: Vec<String>,

    /// Timeout for the metadata request.
    #[serde(default = "default_check_timeout_secs")]
    pub check_timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_subtrees() -> Vec<String> {
    vec!["dist".to_string(), "server".to_string()]
}

fn default_excluded_names() -> Vec<String> {
    vec![
        "server_db.json".to_string(),
        "local_db.json".to_string(),
        "node_modules".to_string(),
    ]
}

fn default_check_timeout_secs() -> u64 {
    DEFAULT_CHECK_TIMEOUT_SECS
}

impl UpdaterConfig {
    /// Create a config with default layout for the given endpoint and root.
    pub fn new(metadata_url: impl Into<String>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            metadata_url: metadata_url.into(),
            install_root: install_root.into(),
            archive_path: None,
            staging_dir: None,
            subtrees_to_merge: default_subtrees(),
            excluded_names: default_excluded_names(),
            check_timeout_secs: DEFAULT_CHECK_TIMEOUT_SECS,
            user_agent: None,
        }
    }

    /// Set the archive download path.
    pub fn with_archive_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = Some(path.into());
        self
    }

    /// Set the staging directory.
    pub fn with_staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    /// Replace the merge whitelist.
    pub fn with_subtrees<I, S>(mut self, subtrees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtrees_to_merge = subtrees.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the exclusion list.
    pub fn with_excluded_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the metadata request timeout.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Resolved archive path (`<install_root>/update_temp.zip` by default).
    pub fn archive_path(&self) -> PathBuf {
        self.archive_path
            .clone()
            .unwrap_or_else(|| self.install_root.join(DEFAULT_ARCHIVE_NAME))
    }

    /// Resolved staging directory (sibling of the install root by default).
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(|| {
            self.install_root
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_STAGING_NAME)
        })
    }

    /// Metadata request timeout.
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// User-Agent header value.
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("stagehand/{}", env!("CARGO_PKG_VERSION")))
    }

    /// The immutable merge plan for a run.
    pub fn apply_plan(&self) -> ApplyPlan {
        ApplyPlan::new(
            self.subtrees_to_merge.iter().cloned(),
            self.excluded_names.iter().cloned(),
        )
    }
}
