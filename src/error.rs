//! Error types for Stagehand operations.
//!
//! This module defines [`StagehandError`], the primary error type used
//! throughout the update pipeline, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Each pipeline stage fails with its own variant so callers can tell a
//!   failed check (retry later) from a failed apply (installation may be
//!   partially updated)
//! - A `416 Range Not Satisfiable` reply is not an error; the downloader
//!   treats it as an already finished transfer
//! - Cleanup failures are logged as warnings and never surface here
//! - Use `anyhow::Error` (via `StagehandError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Stagehand operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// Release metadata could not be fetched or parsed.
    #[error("Update check failed: {message}")]
    CheckFailed { message: String },

    /// Network or stream error while downloading the release archive.
    ///
    /// The partially written file is left on disk for the next attempt.
    #[error("Download from {url} failed: {message}")]
    DownloadFailed { url: String, message: String },

    /// The archive is corrupt or has no discoverable root directory.
    #[error("Extraction failed: {message}")]
    ExtractionFailed { message: String },

    /// I/O error while merging staged files into the installation.
    #[error("Failed to apply update at {path}: {message}")]
    ApplyFailed { path: PathBuf, message: String },

    /// The run was cancelled through its cancellation token.
    #[error("Update cancelled during {stage}")]
    Cancelled { stage: String },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagehandError {
    /// Whether the failure left the live installation untouched.
    ///
    /// Only an apply failure can leave non-excluded files partially updated.
    pub fn installation_untouched(&self) -> bool {
        !matches!(self, StagehandError::ApplyFailed { .. })
    }
}

/// Result type alias for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_failed_displays_message() {
        let err = StagehandError::CheckFailed {
            message: "operation timed out".into(),
        };
        assert!(err.to_string().contains("operation timed out"));
    }

    #[test]
    fn download_failed_displays_url_and_message() {
        let err = StagehandError::DownloadFailed {
            url: "https://example.com/release.zip".into(),
            message: "connection reset".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/release.zip"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn extraction_failed_displays_message() {
        let err = StagehandError::ExtractionFailed {
            message: "no root directory".into(),
        };
        assert!(err.to_string().contains("no root directory"));
    }

    #[test]
    fn apply_failed_displays_path() {
        let err = StagehandError::ApplyFailed {
            path: PathBuf::from("/srv/app/dist/index.html"),
            message: "permission denied".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/srv/app/dist/index.html"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn cancelled_displays_stage() {
        let err = StagehandError::Cancelled {
            stage: "download".into(),
        };
        assert_eq!(err.to_string(), "Update cancelled during download");
    }

    #[test]
    fn only_apply_failures_touch_installation() {
        assert!(StagehandError::CheckFailed {
            message: "x".into()
        }
        .installation_untouched());
        assert!(StagehandError::ExtractionFailed {
            message: "x".into()
        }
        .installation_untouched());
        assert!(!StagehandError::ApplyFailed {
            path: PathBuf::from("/a"),
            message: "x".into()
        }
        .installation_untouched());
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: StagehandError = io_err.into();
        assert!(matches!(err, StagehandError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(StagehandError::ConfigValidationError {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
