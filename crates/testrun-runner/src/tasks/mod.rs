//! Built-in collaborator tasks.
//!
//! Thin single-purpose wrappers that follow the task calling contract; the
//! interesting coordination lives in the runner and the log server.

mod command;
mod fs;
mod template;

pub use command::{install_packages, run_command, CommandSpec};
pub use fs::{copy, remove};
pub use template::process_template_file;
