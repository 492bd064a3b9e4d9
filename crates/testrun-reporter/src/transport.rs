//! Delivery of log batches to the log server.

use async_trait::async_trait;
use testrun_core::LogBatch;
use tracing::debug;

use crate::error::ReporterError;

/// Delivers log batches.
///
/// Implement this to ship batches over something other than HTTP.
#[async_trait]
pub trait LogTransport: Send + Sync {
    /// Deliver one batch.
    async fn send(&self, batch: &LogBatch) -> Result<(), ReporterError>;
}

/// HTTP transport posting JSON batches to the log server.
pub struct HttpTransport {
    inner: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Transport to a log server on the local host.
    pub fn new(port: u16) -> Self {
        Self::with_host("127.0.0.1", port)
    }

    /// Transport to a log server on `host`.
    pub fn with_host(host: &str, port: u16) -> Self {
        Self {
            inner: reqwest::Client::new(),
            url: format!("http://{}:{}", host, port),
        }
    }

    /// Log server URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LogTransport for HttpTransport {
    async fn send(&self, batch: &LogBatch) -> Result<(), ReporterError> {
        debug!(url = %self.url, lines = batch.logs.len(), "POST log batch");

        let response = self.inner.post(&self.url).json(batch).send().await?;
        if !response.status().is_success() {
            return Err(ReporterError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}
