//! Release metadata checking.
//!
//! Fetches the latest release from the metadata endpoint and decides
//! whether it differs from the running version. Versions are compared as
//! opaque strings after stripping a leading `v`: any difference counts as
//! an available update, including a remote tag that looks older.

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, StagehandError};

/// Current version of stagehand.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Latest release as reported by the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    /// Version tag with any leading `v` removed.
    pub tag: String,
    /// Location of the release archive.
    pub archive_url: String,
    /// Human-facing release page, when provided.
    pub html_url: Option<String>,
    /// Publication time, when provided.
    pub published_at: Option<DateTime<Utc>>,
}

/// Result of comparing the running version with the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The running version matches the latest release.
    UpToDate,
    /// A different release is available.
    NewVersionAvailable(ReleaseMetadata),
}

impl CheckOutcome {
    /// Whether an update is available.
    pub fn update_available(&self) -> bool {
        matches!(self, CheckOutcome::NewVersionAvailable(_))
    }
}

/// Endpoint response body (GitHub "latest release" shape).
#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    tag_name: String,
    zipball_url: String,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

/// Strip surrounding whitespace and a single leading `v`.
pub fn normalize_version(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed)
}

/// Whether `latest` should be installed over `current`.
///
/// This is an equality check, not an ordering.
pub fn is_update_available(current: &str, latest: &str) -> bool {
    normalize_version(current) != normalize_version(latest)
}

/// Queries the release metadata endpoint.
pub struct VersionChecker {
    client: Client,
    metadata_url: String,
    timeout: Duration,
}

impl VersionChecker {
    /// Create a checker with the given request timeout.
    pub fn new(metadata_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| StagehandError::CheckFailed {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            metadata_url: metadata_url.into(),
            timeout,
        })
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the metadata endpoint.
    pub fn metadata_url(&self) -> &str {
        &self.metadata_url
    }

    /// Fetch the latest release metadata.
    pub fn fetch_latest(&self) -> Result<ReleaseMetadata> {
        tracing::debug!("Fetching release metadata from {}", self.metadata_url);

        let response = self
            .client
            .get(&self.metadata_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StagehandError::CheckFailed {
                message: format!("HTTP {} fetching {}", status, self.metadata_url),
            });
        }

        let body: ReleaseResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                self.request_error(e)
            } else {
                StagehandError::CheckFailed {
                    message: format!("Invalid release metadata: {}", e),
                }
            }
        })?;

        let tag = normalize_version(&body.tag_name);
        if tag.is_empty() {
            return Err(StagehandError::CheckFailed {
                message: "Release metadata has an empty tag_name".to_string(),
            });
        }
        if body.zipball_url.trim().is_empty() {
            return Err(StagehandError::CheckFailed {
                message: "Release metadata has an empty zipball_url".to_string(),
            });
        }

        Ok(ReleaseMetadata {
            tag: tag.to_string(),
            archive_url: body.zipball_url,
            html_url: body.html_url,
            published_at: body.published_at,
        })
    }

    /// Compare the running version with the latest release.
    pub fn check(&self, current_version: &str) -> Result<CheckOutcome> {
        let release = self.fetch_latest()?;

        if is_update_available(current_version, &release.tag) {
            tracing::info!(
                "New version found: {} (running {})",
                release.tag,
                normalize_version(current_version)
            );
            Ok(CheckOutcome::NewVersionAvailable(release))
        } else {
            tracing::info!("Already up to date at {}", release.tag);
            Ok(CheckOutcome::UpToDate)
        }
    }

    fn request_error(&self, err: reqwest::Error) -> StagehandError {
        let message = if err.is_timeout() {
            format!(
                "Timed out after {}s waiting for {}",
                self.timeout.as_secs_f64(),
                self.metadata_url
            )
        } else {
            err.to_string()
        };
        StagehandError::CheckFailed { message }
    }
}
