//! Submission lifecycle: `Idle -> Uploading -> Processing -> Completed | Error`.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Idle,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl ProcessingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Idle, Uploading)
                | (Idle, Error)
                | (Uploading, Processing)
                | (Uploading, Error)
                | (Processing, Completed)
                | (Processing, Error)
        )
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Uploading => write!(f, "uploading"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Status of one submission, published to any number of subscribers.
///
/// There is one writer (the pipeline run that owns the tracker). A new
/// submission gets a fresh tracker; terminal states are never left.
#[derive(Debug)]
pub struct SubmissionTracker {
    tx: watch::Sender<ProcessingStatus>,
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProcessingStatus::Idle);
        Self { tx }
    }

    pub fn status(&self) -> ProcessingStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProcessingStatus> {
        self.tx.subscribe()
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&self, next: ProcessingStatus) -> Result<()> {
        let from = self.status();
        if !from.can_transition_to(next) {
            return Err(Error::InvalidTransition { from, to: next });
        }
        debug!("Submission status {} -> {}", from, next);
        self.tx.send_replace(next);
        Ok(())
    }
}
