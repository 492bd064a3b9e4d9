//! TAP reporter driven by test framework callbacks.

use testrun_core::{LogBatch, Platform, TapLine};
use tracing::{error, info};

use crate::transport::LogTransport;

/// Streams TAP lines for one test run.
///
/// Tests are numbered from 0 in completion order; pending tests take a
/// number but count neither as passed nor failed.
pub struct TapReporter<T> {
    transport: T,
    platform: Platform,
    passes: u64,
    failures: u64,
    completed: u64,
}

impl<T: LogTransport> TapReporter<T> {
    /// Create a reporter sending through `transport`, tagged with `platform`.
    pub fn new(transport: T, platform: Platform) -> Self {
        Self {
            transport,
            platform,
            passes: 0,
            failures: 0,
            completed: 0,
        }
    }

    /// Run started with `total` tests.
    pub async fn start(&mut self, total: u64) {
        self.send(TapLine::Plan { total }).await;
    }

    /// Test skipped or pending.
    pub async fn pending(&mut self, title: &str) {
        let line = TapLine::skipped(self.next_number(), title);
        self.send(line).await;
    }

    /// Test passed.
    pub async fn pass(&mut self, title: &str) {
        self.passes += 1;
        let line = TapLine::ok(self.next_number(), title);
        self.send(line).await;
    }

    /// Test failed. `detail` is the stack trace when available, otherwise
    /// the error message.
    pub async fn fail(&mut self, title: &str, detail: Option<&str>) {
        self.failures += 1;
        let line = TapLine::not_ok(self.next_number(), title, detail);
        self.send(line).await;
    }

    /// Run finished: emit the trailer.
    pub async fn end(&mut self) {
        self.send(TapLine::Tests(self.passes + self.failures)).await;
        self.send(TapLine::Pass(self.passes)).await;
        self.send(TapLine::Fail(self.failures)).await;
    }

    /// Ship an arbitrary line, e.g. output relayed from another TAP producer.
    pub async fn log(&self, message: &str) {
        info!(platform = %self.platform, "Reporter: {}", message);

        let batch = LogBatch::single(self.platform, message);
        if let Err(e) = self.transport.send(&batch).await {
            error!(error = %e, "Failed sending log to server");
        }
    }

    async fn send(&self, line: TapLine) {
        self.log(&line.to_string()).await;
    }

    fn next_number(&mut self) -> u64 {
        let number = self.completed;
        self.completed += 1;
        number
    }
}
