//! Progress events emitted by an apply run, and the terminal summary.

use crate::domain::ActionKind;
use crate::error::{ErrorKind, ExtractError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub outcome: ApplyOutcome,
    pub total: usize,
    pub files_written: usize,
    pub bytes_written: u64,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApplySummary {
    pub(crate) fn failed_before_start(total: usize, error: &ExtractError) -> Self {
        Self {
            outcome: ApplyOutcome::Failed,
            total,
            files_written: 0,
            bytes_written: 0,
            failed: 0,
            skipped: total,
            warnings: 0,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }

    /// One-line human summary for any terminal state.
    pub fn describe(&self) -> String {
        let counts = format!(
            "{} of {} files written ({} bytes), {} warnings, {} failed",
            self.files_written, self.total, self.bytes_written, self.warnings, self.failed
        );
        match self.outcome {
            ApplyOutcome::Completed => format!("Completed: {counts}"),
            ApplyOutcome::Cancelled => format!("Cancelled: {counts}, {} skipped", self.skipped),
            ApplyOutcome::Failed => format!(
                "Failed ({}): {counts}, {} skipped",
                self.error_kind.map(|k| k.as_str()).unwrap_or("error"),
                self.skipped
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ApplyEvent {
    Started {
        total: usize,
        destination: PathBuf,
    },
    FileCompleted {
        index: usize,
        path: String,
        kind: ActionKind,
        bytes: u64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    FileFailed {
        index: usize,
        path: String,
        kind: ActionKind,
        error: String,
    },
    Cancelled {
        completed: usize,
        skipped: usize,
    },
    Aborted {
        kind: ErrorKind,
        message: String,
    },
    Finished {
        summary: ApplySummary,
    },
}

impl ApplyEvent {
    /// Whether this event finishes one action (success or failure).
    pub fn is_file_event(&self) -> bool {
        matches!(self, Self::FileCompleted { .. } | Self::FileFailed { .. })
    }

    pub fn summary(&self) -> Option<&ApplySummary> {
        match self {
            Self::Finished { summary } => Some(summary),
            _ => None,
        }
    }
}

/// Receiver of progress events. Closures taking an [`ApplyEvent`] qualify.
pub trait ProgressSink {
    fn emit(&mut self, event: ApplyEvent);
}

impl<F: FnMut(ApplyEvent)> ProgressSink for F {
    fn emit(&mut self, event: ApplyEvent) {
        self(event)
    }
}
