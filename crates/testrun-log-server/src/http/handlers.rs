//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use testrun_core::LogBatch;
use tracing::{debug, warn};

use crate::state::LogServerState;

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Browser preflight. Headers are added by the router.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Accept a log batch.
///
/// The body is decoded by hand because browser harnesses post without a
/// JSON content type.
///
/// Lines are relayed before the `{}` acknowledgement is returned, so a
/// harness that posts one batch at a time sees its lines relayed in order.
/// Relaying only runs the synchronous `log.data` listeners and never waits
/// on the shutdown it may trigger.
pub async fn receive_batch(State(state): State<Arc<LogServerState>>, body: Bytes) -> Response {
    match LogBatch::from_slice(&body) {
        Ok(batch) => {
            debug!(
                platform = %batch.platform,
                lines = batch.logs.len(),
                "Received log batch"
            );
            state.handle_batch(batch);
            (StatusCode::OK, "{}").into_response()
        }
        Err(e) => {
            warn!(error = %e, body_len = body.len(), "Rejecting malformed log batch");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
