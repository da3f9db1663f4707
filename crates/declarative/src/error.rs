//! Error types for reconciliation.
//!
//! Errors are categorized so the caller can pick an exit code and the
//! operator can tell a bad invocation from a failing tool from a host whose
//! state could not be read.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A precondition for the run does not hold (nothing was mutated)
    Precondition,
    /// An external command failed or could not be spawned
    ExternalTool,
    /// Current state could not be determined
    StateCheck,
}

impl ErrorCategory {
    /// Process exit code for this category.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Precondition => 2,
            Self::ExternalTool => 3,
            Self::StateCheck => 4,
        }
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Precondition => "Precondition not met",
            Self::ExternalTool => "External command failed",
            Self::StateCheck => "Could not read current state",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Precondition => "Fix the invocation or environment and run again",
            Self::ExternalTool => "Inspect the command output above, fix the cause and re-run",
            Self::StateCheck => "Check that the probing tool works on this host, then re-run",
        }
    }
}

/// Errors that can occur while reconciling a host.
#[derive(Debug, Error)]
pub enum Error {
    /// A run precondition does not hold
    #[error("{message}")]
    Precondition {
        /// What is missing or wrong
        message: String,
    },

    /// An external command exited unsuccessfully
    #[error("command failed: {command} (exit {}){}", code_str(.code), stderr_suffix(.stderr))]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured diagnostic output
        stderr: String,
    },

    /// An external command could not be started
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        #[source]
        source: io::Error,
    },

    /// Current state of a resource could not be read
    #[error("cannot determine state of {resource}: {message}")]
    StateCheck {
        /// Resource identifier
        resource: String,
        /// Why the probe failed
        message: String,
    },

    /// A filesystem operation failed
    #[error("{action} {}: {source}", .path.display())]
    Io {
        /// What was being done
        action: &'static str,
        /// Path being operated on
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn code_str(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

impl Error {
    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Create a state-check error
    pub fn state(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StateCheck {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with the path it concerns
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Precondition { .. } => ErrorCategory::Precondition,
            Self::CommandFailed { .. } | Self::Spawn { .. } | Self::Io { .. } => {
                ErrorCategory::ExternalTool
            }
            Self::StateCheck { .. } => ErrorCategory::StateCheck,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;
