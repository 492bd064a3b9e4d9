//! Log server configuration.

/// Log server configuration.
#[derive(Debug, Clone)]
pub struct LogServerConfig {
    /// Listener bind address. Port 0 asks the OS for an ephemeral port.
    pub bind_addr: String,

    /// Echo every received line to stdout.
    pub echo_to_console: bool,
}

impl Default for LogServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".to_string(),
            echo_to_console: true,
        }
    }
}
