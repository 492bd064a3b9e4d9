//! Error types for the pipeline runner.

use std::path::PathBuf;
use std::process::ExitStatus;

use testrun_core::{EventKind, RunFailure};
use thiserror::Error;

/// Boxed error returned by task callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that settle a pipeline run.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A task returned an error.
    #[error("Task {index} ({label}) failed: {source}")]
    TaskFailed {
        index: usize,
        label: String,
        source: BoxError,
    },

    /// A task panicked while executing.
    #[error("Task {index} ({label}) panicked")]
    TaskPanicked { index: usize, label: String },

    /// A task was cancelled before completing.
    #[error("Task {index} ({label}) was cancelled")]
    TaskCancelled { index: usize, label: String },

    /// A wait gate fired with an error payload.
    #[error("Wait gate '{event}' failed: {failure}")]
    GateFailed {
        event: EventKind,
        #[source]
        failure: RunFailure,
    },

    /// `run()` was called on a runner that already ran.
    #[error("Runner has already been run")]
    AlreadyRun,

    /// A wait gate was registered while no pipeline was executing.
    #[error("Cannot wait for '{0}' outside of a running pipeline")]
    NotRunning(EventKind),
}

impl RunnerError {
    /// The run failure signal carried by a failed gate, if any.
    pub fn run_failure(&self) -> Option<&RunFailure> {
        match self {
            Self::GateFailed { failure, .. } => Some(failure),
            _ => None,
        }
    }
}

/// Errors raised by the built-in collaborator tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Filesystem operation failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Template could not be rendered.
    #[error("Failed to render template '{}': {message}", path.display())]
    Template { path: PathBuf, message: String },

    /// Child process could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// Child process exited unsuccessfully.
    #[error("Command '{program}' exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },
}
