//! Error types for the reporter.

use thiserror::Error;

/// Errors that can occur when delivering a log batch.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server rejected the batch.
    #[error("log server rejected batch: HTTP {0}")]
    Rejected(u16),
}
