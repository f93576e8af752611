//! Update command implementation.
//!
//! The `stagehand update` command runs the full pipeline against the
//! configured installation.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::cli::args::UpdateArgs;
use crate::cli::output::{ConsoleSink, JsonLinesSink, Theme};
use crate::config::load_config;
use crate::error::{Result, StagehandError};
use crate::updates::{UpdateOutcome, UpdatePipeline};

use super::dispatcher::{Command, CommandResult};

/// The update command implementation.
pub struct UpdateCommand {
    config_path: PathBuf,
    args: UpdateArgs,
}

impl UpdateCommand {
    /// Create a new update command.
    pub fn new(config_path: &Path, args: UpdateArgs) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            args,
        }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &UpdateArgs {
        &self.args
    }

    fn report(
        &self,
        outcome: &UpdateOutcome,
        failure: Option<&StagehandError>,
        out: &mut dyn Write,
    ) -> Result<()> {
        if self.args.json {
            let json = serde_json::to_string(outcome).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", json)?;
            return Ok(());
        }

        let theme = Theme::new();
        if let Some(err) = failure {
            if !err.installation_untouched() {
                writeln!(
                    out,
                    "{} The installation may be partially updated. Rerun the update to finish it.",
                    theme.error.apply_to("!")
                )?;
            }
        } else if let (true, Some(version)) = (outcome.updated, &outcome.version) {
            writeln!(
                out,
                "{} Updated to {}. Restart the application to load it.",
                theme.success.apply_to("✓"),
                theme.highlight.apply_to(version)
            )?;
        }
        Ok(())
    }
}

impl Command for UpdateCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let config = load_config(&self.config_path)?;
        let mut pipeline = UpdatePipeline::new(config);

        let result = if self.args.json {
            pipeline.try_run(&self.args.current_version, &mut JsonLinesSink::new(&mut *out))
        } else {
            pipeline.try_run(&self.args.current_version, &mut ConsoleSink::new(&mut *out))
        };

        match result {
            Ok(outcome) => {
                self.report(&outcome, None, out)?;
                Ok(CommandResult::success())
            }
            Err(err) => {
                self.report(&UpdateOutcome::from(&err), Some(&err), out)?;
                Ok(CommandResult::failure(1))
            }
        }
    }
}
