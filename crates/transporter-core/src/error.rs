//! Error types for psql-transporter

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::runner::Phase;

/// Top-level error for one transfer invocation
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Selection error: {0}")]
    Selection(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A phase's external process failed. Later phases were not attempted.
    #[error("{phase} failed: {source}")]
    Phase {
        phase: Phase,
        #[source]
        source: ProcessError,
    },

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// The phase that failed, if this is a phase execution error
    pub fn phase(&self) -> Option<Phase> {
        match self {
            TransferError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Rejections raised before any destructive action is possible
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("destination {0:?} is protected; aborting")]
    ProtectedDestination(String),

    #[error("source and destination cannot be the same ({0:?})")]
    IdenticalEndpoints(String),

    #[error("file to file transfers are not supported")]
    UnsupportedFileToFile,

    #[error("no valid destination: every configured database is protected")]
    NoDestinationCandidates,

    #[error("dump file {} does not exist or cannot be read", .0.display())]
    MissingDumpFile(PathBuf),
}

/// Failure of one external tool invocation
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit. `stderr` is the tool's diagnostic output, verbatim.
    #[error("{tool} exited with {}{}", describe_code(.code), describe_stderr(.stderr))]
    Exited {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {}s", .after.as_secs())]
    TimedOut { tool: String, after: Duration },

    #[error("{tool} was cancelled")]
    Cancelled { tool: String },

    #[error("cannot read dump file {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error while running {tool}: {source}")]
    Io {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// Captured diagnostic text, when the tool ran to a non-zero exit
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ProcessError::Exited { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status (terminated by signal)".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

/// Result type alias for transfer operations
pub type Result<T> = std::result::Result<T, TransferError>;
