//! Check command implementation.
//!
//! The `stagehand check` command asks the release endpoint for the latest
//! version without downloading anything.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::args::CheckArgs;
use crate::cli::output::Theme;
use crate::config::load_config;
use crate::error::Result;
use crate::updates::{normalize_version, CheckOutcome, UpdatePipeline};

use super::dispatcher::{Command, CommandResult};

/// The check command implementation.
pub struct CheckCommand {
    config_path: PathBuf,
    args: CheckArgs,
}

/// Machine-readable check result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    current: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest: Option<&'a str>,
    update_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    archive_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CheckCommand {
    /// Create a new check command.
    pub fn new(config_path: &Path, args: CheckArgs) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            args,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &CheckArgs {
        &self.args
    }
}

impl Command for CheckCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let config = load_config(&self.config_path)?;
        let pipeline = UpdatePipeline::new(config);
        let current = normalize_version(&self.args.current_version);
        let theme = Theme::new();

        let outcome = pipeline
            .checker()
            .and_then(|checker| checker.check(&self.args.current_version));

        let (report, exit) = match &outcome {
            Ok(CheckOutcome::UpToDate) => (
                CheckReport {
                    current,
                    latest: Some(current),
                    update_available: false,
                    archive_url: None,
                    error: None,
                },
                CommandResult::success(),
            ),
            Ok(CheckOutcome::NewVersionAvailable(release)) => (
                CheckReport {
                    current,
                    latest: Some(&release.tag),
                    update_available: true,
                    archive_url: Some(&release.archive_url),
                    error: None,
                },
                CommandResult::success(),
            ),
            Err(e) => (
                CheckReport {
                    current,
                    latest: None,
                    update_available: false,
                    archive_url: None,
                    error: Some(e.to_string()),
                },
                CommandResult::failure(1),
            ),
        };

        if self.args.json {
            let json = serde_json::to_string(&report).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", json)?;
        } else if let Some(error) = &report.error {
            writeln!(out, "{} {}", theme.error.apply_to("✗"), error)?;
        } else if let (true, Some(latest)) = (report.update_available, report.latest) {
            writeln!(
                out,
                "{} Update available: {} → {}",
                theme.info.apply_to("›"),
                current,
                theme.highlight.apply_to(latest)
            )?;
        } else {
            writeln!(out, "{} Up to date ({})", theme.success.apply_to("✓"), current)?;
        }

        Ok(exit)
    }
}
