//! Pipeline state machine.

use std::fmt;

/// Where a pipeline run currently is.
///
/// ```text
/// Idle → Checking → UpToDate
///                 → Found → Downloading → Downloaded → Extracting → Extracted
///                         → Applying → Applied → CleaningUp → Done
/// ```
///
/// Any non-terminal state may move to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Checking,
    UpToDate,
    Found,
    Downloading,
    Downloaded,
    Extracting,
    Extracted,
    Applying,
    Applied,
    CleaningUp,
    Done,
    Error,
}

impl PipelineState {
    /// Whether the run has finished in this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::UpToDate | Self::Done | Self::Error)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        if next == Error {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Idle, Checking)
                | (Checking, UpToDate)
                | (Checking, Found)
                | (Found, Downloading)
                | (Downloading, Downloaded)
                | (Downloaded, Extracting)
                | (Extracting, Extracted)
                | (Extracted, Applying)
                | (Applying, Applied)
                | (Applied, CleaningUp)
                | (CleaningUp, Done)
        )
    }

    /// Lowercase name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::UpToDate => "up-to-date",
            Self::Found => "found",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Extracting => "extracting",
            Self::Extracted => "extracted",
            Self::Applying => "applying",
            Self::Applied => "applied",
            Self::CleaningUp => "cleaning-up",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
