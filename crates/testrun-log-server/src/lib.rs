//! TestRun Log Aggregation Server
//!
//! An ephemeral HTTP endpoint that collects TAP output posted by remote test
//! harnesses, relays every line through the runner's event bus and decides
//! the run outcome from the TAP trailer.

pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod state;

pub use config::LogServerConfig;
pub use error::LogServerError;
pub use server::{log_server, log_server_with_config, start_log_server, start_with_config};
pub use state::LogServerState;
