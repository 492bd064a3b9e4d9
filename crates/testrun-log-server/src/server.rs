//! Log server lifecycle.

use std::sync::Arc;

use axum::Router;
use testrun_core::{EventKind, RunEvent, RunFailure};
use testrun_runner::{RunContext, TaskDescriptor};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::LogServerConfig;
use crate::error::LogServerError;
use crate::http;
use crate::state::LogServerState;

/// Start the log server on an ephemeral port.
///
/// Registers a wait gate on `log.end`, emits `log.start` with the bound port
/// and returns that port.
pub async fn start_log_server(
    echo_to_console: bool,
    ctx: &RunContext,
) -> Result<u16, LogServerError> {
    let config = LogServerConfig {
        echo_to_console,
        ..Default::default()
    };
    start_with_config(config, ctx).await
}

/// Start the log server with an explicit configuration.
pub async fn start_with_config(
    config: LogServerConfig,
    ctx: &RunContext,
) -> Result<u16, LogServerError> {
    ctx.wait_for_event(EventKind::LogEnd)?;

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| LogServerError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;
    let port = listener.local_addr()?.port();

    let state = LogServerState::new(ctx.clone(), config.echo_to_console);
    let router = http::create_router(state.clone());
    tokio::spawn(serve(listener, router, state));

    ctx.emit(RunEvent::LogStart { port });
    info!(port, "LogServer listening on port: {}", port);

    Ok(port)
}

/// Serve until a verdict is reached or the run settles, then report.
async fn serve(listener: TcpListener, router: Router, state: Arc<LogServerState>) {
    let shutdown = state.shutdown.clone();
    let ctx = state.ctx.clone();
    let signal = async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = ctx.finished() => {}
        }
    };

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(signal)
        .await;

    let outcome = match (state.take_outcome(), result) {
        (Some(outcome), _) => outcome,
        (None, Err(e)) => {
            error!(error = %e, "Log server error");
            Err(RunFailure::new(format!("Log server failed: {}", e)))
        }
        (None, Ok(())) => {
            debug!("Run settled before a verdict, log server stopped");
            return;
        }
    };

    info!(success = outcome.is_ok(), "Log server shut down");
    state.ctx.emit(RunEvent::LogEnd { outcome });
}

/// Pipeline task that starts the log server with default settings.
pub fn log_server(echo_to_console: bool) -> TaskDescriptor {
    log_server_with_config(LogServerConfig {
        echo_to_console,
        ..Default::default()
    })
}

/// Pipeline task that starts the log server with `config`.
pub fn log_server_with_config(config: LogServerConfig) -> TaskDescriptor {
    TaskDescriptor::named(
        "logServer",
        move |_, ctx| {
            let config = config.clone();
            async move { start_with_config(config, &ctx).await }
        },
        Vec::new(),
    )
}
