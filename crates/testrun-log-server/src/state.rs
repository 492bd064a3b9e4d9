//! Shared log server state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use testrun_core::{scan_trailer, LogBatch, RunEvent, RunFailure, TrailerVerdict};
use testrun_runner::RunContext;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// State shared by the request handlers and the serve loop.
pub struct LogServerState {
    /// Runner the server reports to.
    pub ctx: RunContext,

    /// Echo every received line to stdout.
    pub echo_to_console: bool,

    /// Cancelled exactly once, when the trailer decides the run.
    pub shutdown: CancellationToken,

    decided: AtomicBool,
    outcome: Mutex<Option<Result<(), RunFailure>>>,
}

impl LogServerState {
    /// Create a new LogServerState wrapped in Arc.
    pub fn new(ctx: RunContext, echo_to_console: bool) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            echo_to_console,
            shutdown: CancellationToken::new(),
            decided: AtomicBool::new(false),
            outcome: Mutex::new(None),
        })
    }

    /// Relay a batch line by line and scan each for a trailer verdict.
    pub fn handle_batch(&self, batch: LogBatch) {
        let platform = batch.platform;
        for line in batch.logs {
            self.ctx.emit(RunEvent::LogData {
                line: line.clone(),
                platform,
            });
            if self.echo_to_console {
                println!("{}", line);
            }

            if let Some(verdict) = scan_trailer(&line) {
                self.decide(verdict);
            }
        }
    }

    /// Record the verdict and request shutdown. Only the first call wins.
    pub fn decide(&self, verdict: TrailerVerdict) -> bool {
        if self.decided.swap(true, Ordering::SeqCst) {
            debug!(?verdict, "Verdict already reached, ignoring trailer line");
            return false;
        }

        info!(?verdict, "TAP trailer detected, shutting down log server");
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(verdict.into_outcome());
        self.shutdown.cancel();
        true
    }

    /// Take the recorded verdict, if any.
    pub fn take_outcome(&self) -> Option<Result<(), RunFailure>> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
