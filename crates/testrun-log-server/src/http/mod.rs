//! HTTP surface of the log server.
//!
//! Every path accepts:
//! - `OPTIONS` for browser preflight
//! - `POST` with a JSON log batch
//!
//! All responses carry permissive CORS headers and a JSON content type.

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue},
    routing::post,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::LogServerState;

mod handlers;

pub use handlers::ErrorResponse;

/// Headers attached to every response.
pub const CORS_HEADERS: [(HeaderName, &str); 5] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (
        header::ACCESS_CONTROL_ALLOW_METHODS,
        "GET, POST, PUT, DELETE, OPTIONS",
    ),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type, accept"),
    (header::ACCESS_CONTROL_MAX_AGE, "10"),
    (header::CONTENT_TYPE, "application/json"),
];

/// Create the HTTP router.
pub fn create_router(state: Arc<LogServerState>) -> Router {
    let mut router = Router::new()
        .route(
            "/",
            post(handlers::receive_batch).options(handlers::preflight),
        )
        .route(
            "/*path",
            post(handlers::receive_batch).options(handlers::preflight),
        )
        .layer(TraceLayer::new_for_http());

    for (name, value) in CORS_HEADERS {
        router = router.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ));
    }

    router.with_state(state)
}
