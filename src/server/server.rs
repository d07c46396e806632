use anyhow::{Context, Result};
use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, error, info};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::Principal;
use crate::rate_limit::RateLimiter;

use super::session::Session;
use super::sse::mcp_sse;
use super::state::*;
use super::{limit_requests, log_requests, ServerConfig};

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    success: bool,
    token: String,
    user: Principal,
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime": format_uptime(state.start_time.elapsed()),
    }))
}

async fn login(State(state): State<ServerState>, Json(body): Json<LoginBody>) -> Response {
    debug!("login() called for user {}", body.username);

    let principal = match state.credential_store.login(&body.username, &body.password) {
        Ok(principal) => principal,
        Err(err) => {
            debug!("Login rejected: {}", err);
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "Invalid credentials"})),
            )
                .into_response();
        }
    };

    let token = match state.token_authority.issue(&principal) {
        Ok(token) => token,
        Err(err) => {
            error!("Error issuing auth token: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cookie_value = match HeaderValue::from_str(&format!("token={}; Path=/; HttpOnly", token)) {
        Ok(value) => value,
        Err(err) => {
            error!("Error building session cookie: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let response_body = LoginSuccessResponse {
        success: true,
        token,
        user: principal,
    };
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie_value)],
        Json(response_body),
    )
        .into_response()
}

/// One JSON-RPC envelope in, one out, always HTTP 200. Bodies that are not
/// JSON at all get a -32700 envelope rather than a transport error.
async fn mcp_post(
    _session: Session,
    State(dispatcher): State<GuardedDispatcher>,
    body: String,
) -> Response {
    let parsed: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(err) => {
            return Json(crate::mcp::McpResponse::error(
                None,
                crate::mcp::McpError::ParseError(err.to_string()),
            ))
            .into_response();
        }
    };

    Json(dispatcher.dispatch(parsed).await).into_response()
}

/// Raw pass-through surface; authenticated and role-gated but not wired to
/// the cluster. Kept as a placeholder for parity with the MCP tools.
async fn k8s_proxy(session: Session, request: Request<Body>) -> Response {
    if !session.principal.authorize(&["kubernetes:read"]) {
        return (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"error": "Insufficient permissions"})),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "message": "Kubernetes API proxy not implemented",
        "method": request.method().as_str(),
        "path": request.uri().path(),
    }))
    .into_response()
}

fn make_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return Ok(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<_>>()?;
    Ok(layer.allow_origin(origins))
}

pub fn make_app(
    config: ServerConfig,
    dispatcher: GuardedDispatcher,
    token_authority: GuardedTokenAuthority,
    credential_store: GuardedCredentialStore,
) -> Result<Router> {
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max,
        Duration::from_millis(config.rate_limit_window_ms),
    ));
    let cors = make_cors_layer(&config.cors_origins)?;

    let state = ServerState {
        config,
        start_time: Instant::now(),
        dispatcher,
        token_authority,
        credential_store,
        rate_limiter,
    };

    let mut app: Router = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/mcp", post(mcp_post))
        .route("/mcp/sse", get(mcp_sse))
        .route("/api/k8s", any(k8s_proxy))
        .route("/api/k8s/{*path}", any(k8s_proxy))
        .with_state(state.clone());

    app = app.layer(middleware::from_fn_with_state(
        state.clone(),
        limit_requests,
    ));
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));
    app = app.layer(cors);

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    dispatcher: GuardedDispatcher,
    token_authority: GuardedTokenAuthority,
    credential_store: GuardedCredentialStore,
) -> Result<()> {
    let address = format!("{}:{}", config.host, config.port);
    let app = make_app(config, dispatcher, token_authority, credential_store)?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!("Listening on {}", address);
    Ok(axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?)
}
