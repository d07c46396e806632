//! Rate limiting middleware
//!
//! One point per request, keyed by client IP. Rejections carry a
//! `Retry-After` header with the seconds until the window resets.

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use tracing::warn;

use super::super::state::ServerState;

/// Identity key for rate limiting. Requests whose connection info is
/// unavailable share one bucket rather than bypassing the limiter.
fn client_identity(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = client_identity(&request);

    if let Err(retry_after_secs) = state.rate_limiter.consume(&identity) {
        warn!(
            "Rate limit exceeded: {} {} ip={}",
            request.method(),
            request.uri().path(),
            identity
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_after_secs.to_string())],
            Json(json!({
                "error": "Too many requests",
                "retryAfter": retry_after_secs,
            })),
        )
            .into_response();
    }

    next.run(request).await
}
