//! TestRun pipeline runner.
//!
//! Executes an ordered list of task descriptors strictly in sequence. Tasks
//! receive a [`RunContext`] through which they publish events and register
//! wait gates; [`Runner::run`] settles only once the pipeline has finished
//! and every registered gate has fired.
//!
//! # Example
//!
//! ```rust,no_run
//! use testrun_runner::{when, Runner, RunnerConfig, TaskDescriptor};
//!
//! async fn build() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = Runner::new(RunnerConfig::new(vec![
//!         TaskDescriptor::named("prepare", |_, _| async {}, vec![]),
//!         when(|| std::env::var("CI").is_ok(), TaskDescriptor::bare(|_, _| async {})),
//!     ]));
//!
//!     runner.run().await?;
//!     Ok(())
//! }
//! ```

mod conditional;
mod context;
mod error;
mod runner;
mod task;
pub mod tasks;

pub use conditional::{if_then_else, when};
pub use context::RunContext;
pub use error::{BoxError, RunnerError, TaskError};
pub use runner::{Runner, RunnerConfig};
pub use task::{TaskArgs, TaskDescriptor, TaskFuture, TaskOutput};

pub use testrun_core::{EventKind, RunEvent, RunFailure};
