//! The self-update pipeline.
//!
//! This module provides:
//! - Release metadata checks against the latest published version
//! - Resumable archive downloads with throttled progress
//! - Archive staging and root discovery
//! - Whitelisted merge into the live installation
//! - Orchestration via [`UpdatePipeline`]

pub mod apply;
pub mod cancel;
pub mod cleanup;
pub mod download;
pub mod pipeline;
pub mod stage;
pub mod state;
pub mod version;

pub use apply::{ApplyPlan, ApplyReport, MergeApplier};
pub use cancel::CancellationToken;
pub use cleanup::{cleanup_staging, remove_dir_if_exists};
pub use download::{DownloadState, ProgressThrottle, ResumableDownloader, PROGRESS_INTERVAL_BYTES};
pub use pipeline::{UpdateOutcome, UpdatePipeline};
pub use stage::{discover_root, ArchiveStager, StagingManifest};
pub use state::PipelineState;
pub use version::{
    is_update_available, normalize_version, CheckOutcome, ReleaseMetadata, VersionChecker,
    VERSION,
};
