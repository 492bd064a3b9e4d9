//! Events published on the runner's event bus.

use std::fmt;

use thiserror::Error;

use crate::batch::Platform;

/// Error-shaped event payload that fails a run when it reaches a wait gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RunFailure {
    message: String,
}

impl RunFailure {
    /// Create a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure raised when a TAP trailer reports failing or missing tests.
    pub fn tests_failed() -> Self {
        Self::new("One or more tests failed")
    }

    /// Failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An event emitted through the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The log server is listening on `port`.
    LogStart { port: u16 },
    /// A log line was received from a harness.
    LogData { line: String, platform: Platform },
    /// The log server reached a verdict and shut down.
    LogEnd { outcome: Result<(), RunFailure> },
    /// A pipeline-defined event.
    Custom {
        name: String,
        failure: Option<RunFailure>,
    },
}

impl RunEvent {
    /// Create a successful custom event.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom {
            name: name.into(),
            failure: None,
        }
    }

    /// Create a failing custom event.
    pub fn custom_failure(name: impl Into<String>, failure: RunFailure) -> Self {
        Self::Custom {
            name: name.into(),
            failure: Some(failure),
        }
    }

    /// Subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::LogStart { .. } => EventKind::LogStart,
            Self::LogData { .. } => EventKind::LogData,
            Self::LogEnd { .. } => EventKind::LogEnd,
            Self::Custom { name, .. } => EventKind::Custom(name.clone()),
        }
    }

    /// The error payload carried by this event, if any.
    pub fn failure(&self) -> Option<&RunFailure> {
        match self {
            Self::LogEnd { outcome: Err(failure) } => Some(failure),
            Self::Custom {
                failure: Some(failure),
                ..
            } => Some(failure),
            _ => None,
        }
    }
}

/// Key used to subscribe to and wait for events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    LogStart,
    LogData,
    LogEnd,
    Custom(String),
}

impl EventKind {
    /// Create a custom event key.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogStart => f.write_str("log.start"),
            Self::LogData => f.write_str("log.data"),
            Self::LogEnd => f.write_str("log.end"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}
