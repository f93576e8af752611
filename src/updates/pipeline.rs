//! End-to-end update run.
//!
//! Stages run strictly in order: check, download, extract, apply, clean up.
//! Each stage reports to the [`EventSink`] before it starts, and a failure
//! at any stage stops the run with a single `error` event. The only state
//! that deliberately survives a failed run is the partial download on disk.
//!
//! The pipeline takes no locks. Embedders that might start two runs at once
//! against the same paths must serialize them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::apply::MergeApplier;
use super::cancel::CancellationToken;
use super::cleanup::cleanup_staging;
use super::download::ResumableDownloader;
use super::stage::ArchiveStager;
use super::state::PipelineState;
use super::version::{normalize_version, CheckOutcome, VersionChecker};
use crate::config::UpdaterConfig;
use crate::error::{Result, StagehandError};
use crate::events::{EventSink, LifecycleEvent};

/// Summary of a run, shaped for handing back to the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Whether a new release was installed.
    pub updated: bool,
    /// Installed version, when `updated` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Failure message, when the run failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the run finished.
    pub checked_at: DateTime<Utc>,
}

impl UpdateOutcome {
    /// A release was installed.
    pub fn updated(version: impl Into<String>) -> Self {
        Self {
            updated: true,
            version: Some(version.into()),
            error: None,
            checked_at: Utc::now(),
        }
    }

    /// Nothing to do.
    pub fn up_to_date() -> Self {
        Self {
            updated: false,
            version: None,
            error: None,
            checked_at: Utc::now(),
        }
    }

    /// The run failed.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            updated: false,
            version: None,
            error: Some(error.into()),
            checked_at: Utc::now(),
        }
    }

    /// Whether the embedding process should restart to load new files.
    pub fn restart_required(&self) -> bool {
        self.updated
    }

    /// Whether the run failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Drives one installation through check, download, stage, apply, cleanup.
pub struct UpdatePipeline {
    config: UpdaterConfig,
    cancel: CancellationToken,
    state: PipelineState,
}

impl UpdatePipeline {
    /// Create a pipeline for `config`.
    pub fn new(config: UpdaterConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
            state: PipelineState::Idle,
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels this pipeline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Get the configuration.
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Current state of the most recent run.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Build the metadata checker for this configuration.
    pub fn checker(&self) -> Result<VersionChecker> {
        VersionChecker::new(
            self.config.metadata_url.clone(),
            self.config.check_timeout(),
            &self.config.user_agent(),
        )
    }

    /// Run the pipeline, folding any failure into the outcome.
    ///
    /// Never fails: errors become an `error` event plus an outcome with
    /// `error` set.
    pub fn run(&mut self, current_version: &str, sink: &mut dyn EventSink) -> UpdateOutcome {
        match self.try_run(current_version, sink) {
            Ok(outcome) => outcome,
            Err(e) => UpdateOutcome::from(&e),
        }
    }

    /// Run the pipeline, returning typed errors.
    ///
    /// The `error` event is emitted before the error is returned.
    pub fn try_run(
        &mut self,
        current_version: &str,
        sink: &mut dyn EventSink,
    ) -> Result<UpdateOutcome> {
        self.state = PipelineState::Idle;

        let result = self.execute(current_version, sink);
        if let Err(e) = &result {
            tracing::error!("Update failed during {}: {}", self.state, e);
            self.transition(PipelineState::Error);
            sink.emit(LifecycleEvent::error(e.to_string()));
        }
        result
    }

    fn execute(&mut self, current_version: &str, sink: &mut dyn EventSink) -> Result<UpdateOutcome> {
        self.cancel.check("check")?;
        self.transition(PipelineState::Checking);
        sink.emit(LifecycleEvent::Checking);

        let release = match self.checker()?.check(current_version)? {
            CheckOutcome::UpToDate => {
                self.transition(PipelineState::UpToDate);
                sink.emit(LifecycleEvent::UpToDate);
                return Ok(UpdateOutcome::up_to_date());
            }
            CheckOutcome::NewVersionAvailable(release) => release,
        };

        self.transition(PipelineState::Found);
        sink.emit(LifecycleEvent::Found {
            version: release.tag.clone(),
        });

        let archive_path = self.config.archive_path();
        let staging_dir = self.config.staging_dir();

        self.cancel.check("download")?;
        self.transition(PipelineState::Downloading);
        ResumableDownloader::new(&self.config.user_agent())?
            .with_cancellation(self.cancel.clone())
            .download(&release.archive_url, &archive_path, sink)?;
        self.transition(PipelineState::Downloaded);

        self.cancel.check("extraction")?;
        self.transition(PipelineState::Extracting);
        sink.emit(LifecycleEvent::Extracting);
        let manifest = ArchiveStager::new(&staging_dir).stage(&archive_path)?;
        self.transition(PipelineState::Extracted);

        self.cancel.check("apply")?;
        self.transition(PipelineState::Applying);
        sink.emit(LifecycleEvent::Installing);
        MergeApplier::new(self.config.apply_plan()).apply(&manifest, &self.config.install_root)?;
        self.transition(PipelineState::Applied);

        self.transition(PipelineState::CleaningUp);
        cleanup_staging(&manifest.staging_dir);
        self.transition(PipelineState::Done);

        tracing::info!(
            "Updated from {} to {}",
            normalize_version(current_version),
            release.tag
        );
        Ok(UpdateOutcome::updated(release.tag))
    }

    fn transition(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!("Pipeline {} -> {}", self.state, next);
        self.state = next;
    }
}

impl From<&StagehandError> for UpdateOutcome {
    fn from(err: &StagehandError) -> Self {
        UpdateOutcome::failed(err.to_string())
    }
}
