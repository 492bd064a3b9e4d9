//! TestRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Async runtime specifics
//!
//! Everything the runner, the log server and the reporter agree on lives
//! here: the log batch wire format, the TAP line grammar and the event
//! surface shared through the pipeline runner.

pub mod batch;
pub mod error;
pub mod event;
pub mod ids;
pub mod tap;

// Re-export commonly used types
pub use batch::{LogBatch, Platform};
pub use error::CoreError;
pub use event::{EventKind, RunEvent, RunFailure};
pub use ids::RunId;
pub use tap::{scan_trailer, TapLine, TapSummary, TrailerVerdict};
