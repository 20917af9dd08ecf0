//! Typed error taxonomy for the scan → plan → apply pipeline.
//!
//! Precondition failures (`DestinationNotEmpty`, `InvalidDestination`,
//! `DestinationBusy`) are always raised before the first write. `PathEscape`
//! and `SystemicFailure` abort a running apply. Per-file problems are never
//! errors: they travel as warnings on step results and progress events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractError>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Source root is not a readable directory: {path}")]
    InvalidRoot { path: PathBuf },

    #[error("Destination already contains entries: {path}")]
    DestinationNotEmpty { path: PathBuf },

    #[error("Invalid destination {path}: {reason}")]
    InvalidDestination { path: PathBuf, reason: String },

    #[error("Another job is already writing to {path}")]
    DestinationBusy { path: PathBuf },

    #[error("Refusing to write outside destination root: {path}")]
    PathEscape { path: String },

    #[error("Aborted after {consecutive} consecutive file failures (last: {last_error})")]
    SystemicFailure { consecutive: usize, last_error: String },

    #[error("Job {id} not found")]
    JobNotFound { id: String },

    #[error("Job {id} is still {status}")]
    JobNotTerminal { id: String, status: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plan persistence error at {path}: {message}")]
    Persist { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRoot { .. } => ErrorKind::InvalidRoot,
            Self::DestinationNotEmpty { .. } => ErrorKind::DestinationNotEmpty,
            Self::InvalidDestination { .. } => ErrorKind::InvalidDestination,
            Self::DestinationBusy { .. } => ErrorKind::DestinationBusy,
            Self::PathEscape { .. } => ErrorKind::PathEscape,
            Self::SystemicFailure { .. } => ErrorKind::SystemicFailure,
            Self::JobNotFound { .. } => ErrorKind::JobNotFound,
            Self::JobNotTerminal { .. } => ErrorKind::JobNotTerminal,
            Self::Io { .. } => ErrorKind::Io,
            Self::Persist { .. } => ErrorKind::Persist,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Stable, serializable error kind names used in job summaries and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRoot,
    DestinationNotEmpty,
    InvalidDestination,
    DestinationBusy,
    PathEscape,
    SystemicFailure,
    JobNotFound,
    JobNotTerminal,
    Io,
    Persist,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRoot => "invalid_root",
            Self::DestinationNotEmpty => "destination_not_empty",
            Self::InvalidDestination => "invalid_destination",
            Self::DestinationBusy => "destination_busy",
            Self::PathEscape => "path_escape",
            Self::SystemicFailure => "systemic_failure",
            Self::JobNotFound => "job_not_found",
            Self::JobNotTerminal => "job_not_terminal",
            Self::Io => "io",
            Self::Persist => "persist",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_snake_case() {
        let err = ExtractError::DestinationNotEmpty { path: PathBuf::from("/tmp/out") };
        assert_eq!(err.kind(), ErrorKind::DestinationNotEmpty);
        assert_eq!(err.kind().to_string(), "destination_not_empty");
        let json = serde_json::to_string(&ErrorKind::PathEscape).unwrap();
        assert_eq!(json, "\"path_escape\"");
    }

    #[test]
    fn messages_include_context() {
        let err = ExtractError::SystemicFailure { consecutive: 3, last_error: "disk full".into() };
        assert!(err.to_string().contains("3 consecutive"));
        assert!(err.to_string().contains("disk full"));
    }
}
