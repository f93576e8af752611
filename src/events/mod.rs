//! Lifecycle events emitted by the update pipeline.
//!
//! This module provides:
//! - [`LifecycleEvent`], the closed set of status notifications
//! - [`EventSink`], the observer interface the embedding application implements
//! - Stock sinks for recording, channels, closures and logging
//!
//! # Example
//!
//! ```
//! use stagehand::events::{EventSink, LifecycleEvent, RecordingSink};
//!
//! let mut sink = RecordingSink::new();
//! sink.emit(LifecycleEvent::Checking);
//! sink.emit(LifecycleEvent::UpToDate);
//!
//! assert_eq!(sink.names(), vec!["checking", "uptodate"]);
//! ```

pub mod sink;

pub use sink::{ChannelSink, EventSink, FnSink, RecordingSink, TracingSink};

use serde::{Deserialize, Serialize};
use std::fmt;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A status notification describing pipeline progress.
///
/// Serializes as `{"status": "<name>", ...}` with camelCase fields so it can
/// be forwarded verbatim to a UI over a live connection. Download events
/// also carry `downloadedMB` and `totalMB`, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum LifecycleEvent {
    /// Querying the release metadata endpoint.
    Checking,
    /// A release different from the running version exists.
    Found { version: String },
    /// Download progress.
    Downloading {
        percent: u8,
        bytes_written: u64,
        total_bytes: u64,
        #[serde(rename = "downloadedMB")]
        downloaded_mb: f64,
        #[serde(rename = "totalMB")]
        total_mb: f64,
    },
    /// Unpacking the archive into the staging directory.
    Extracting,
    /// Merging staged files into the installation.
    Installing,
    /// The running version matches the latest release.
    UpToDate,
    /// A stage failed; no further events follow.
    Error { message: String },
}

impl LifecycleEvent {
    /// Build a download progress event.
    ///
    /// Percent is `round(bytes_written / total_bytes * 100)` capped at 100,
    /// or 0 when the total is unknown.
    pub fn downloading(bytes_written: u64, total_bytes: u64) -> Self {
        Self::Downloading {
            percent: percent(bytes_written, total_bytes),
            bytes_written,
            total_bytes,
            downloaded_mb: megabytes(bytes_written),
            total_mb: megabytes(total_bytes),
        }
    }

    /// Build an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Found { .. } => "found",
            Self::Downloading { .. } => "downloading",
            Self::Extracting => "extracting",
            Self::Installing => "installing",
            Self::UpToDate => "uptodate",
            Self::Error { .. } => "error",
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::UpToDate | Self::Error { .. })
    }

    /// Megabytes written so far, for download events.
    pub fn downloaded_mb(&self) -> Option<f64> {
        match self {
            Self::Downloading { downloaded_mb, .. } => Some(*downloaded_mb),
            _ => None,
        }
    }

    /// Expected total size in megabytes, for download events.
    pub fn total_mb(&self) -> Option<f64> {
        match self {
            Self::Downloading { total_mb, .. } => Some(*total_mb),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "Checking for updates"),
            Self::Found { version } => write!(f, "Found new version {}", version),
            Self::Downloading {
                percent,
                downloaded_mb,
                total_mb,
                ..
            } => write!(
                f,
                "Downloading {}% ({:.1} / {:.1} MB)",
                percent, downloaded_mb, total_mb
            ),
            Self::Extracting => write!(f, "Extracting update"),
            Self::Installing => write!(f, "Installing update"),
            Self::UpToDate => write!(f, "Already up to date"),
            Self::Error { message } => write!(f, "Update failed: {}", message),
        }
    }
}

fn megabytes(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

fn percent(bytes_written: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 0;
    }
    let pct = (bytes_written as f64 / total_bytes as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
