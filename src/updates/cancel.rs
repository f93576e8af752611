//! Cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, StagehandError};

/// Shared flag checked between download chunks and between stages.
///
/// Clones observe the same flag, so one clone can be handed to another
/// thread (a signal handler, a UI button) while the pipeline holds another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` if cancellation has been requested.
    pub fn check(&self, stage: &str) -> Result<()> {
        if self.is_cancelled() {
            tracing::info!("Cancellation requested before {}", stage);
            return Err(StagehandError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}
