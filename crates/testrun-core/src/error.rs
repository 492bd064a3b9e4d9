//! Core domain errors.

use thiserror::Error;

/// Core domain errors for TestRun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Unknown reporting platform tag.
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    /// Log batch could not be decoded.
    #[error("Malformed log batch: {0}")]
    MalformedBatch(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedBatch(err.to_string())
    }
}
