//! Log server errors.

use testrun_runner::RunnerError;
use thiserror::Error;

/// Errors that can occur while starting the log server.
#[derive(Debug, Error)]
pub enum LogServerError {
    /// The listener could not be bound.
    #[error("Failed to bind log server to '{addr}': {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// I/O error on the bound listener.
    #[error("Log server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The completion gate could not be registered.
    #[error(transparent)]
    Runner(#[from] RunnerError),
}
