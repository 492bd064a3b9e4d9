//! TAP reporter for TestRun.
//!
//! Translates test framework lifecycle callbacks into TAP lines and ships
//! each line to a log server as its own batch. Transport failures are logged
//! and swallowed so they never abort the test run.
//!
//! # Example
//!
//! ```rust,no_run
//! use testrun_core::Platform;
//! use testrun_reporter::{HttpTransport, TapReporter};
//!
//! async fn report(port: u16) {
//!     let mut reporter = TapReporter::new(HttpTransport::new(port), Platform::Node);
//!     reporter.start(1).await;
//!     reporter.pass("math adds").await;
//!     reporter.end().await;
//! }
//! ```

pub mod error;
pub mod reporter;
pub mod transport;

pub use error::ReporterError;
pub use reporter::TapReporter;
pub use transport::{HttpTransport, LogTransport};
