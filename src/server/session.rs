use super::state::ServerState;
use crate::auth::Principal;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::json;
use tracing::debug;

/// Verified caller identity attached to a request.
#[derive(Debug)]
pub struct Session {
    pub principal: Principal,
}

pub const COOKIE_TOKEN_KEY: &str = "token";
pub const QUERY_TOKEN_KEY: &str = "token";
pub const HEADER_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    AccessDenied,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::AccessDenied => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid or expired token"})),
            )
                .into_response(),
        }
    }
}

fn extract_token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_TOKEN_KEY)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

fn extract_token_from_query(parts: &Parts) -> Option<String> {
    parts.uri.query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == QUERY_TOKEN_KEY && !value.is_empty()).then(|| value.to_string())
        })
    })
}

async fn extract_token_from_cookies(parts: &mut Parts, ctx: &ServerState) -> Option<String> {
    CookieJar::from_request_parts(parts, ctx)
        .await
        .ok()?
        .get(COOKIE_TOKEN_KEY)
        .map(Cookie::value)
        .map(|s| s.to_string())
}

async fn extract_session_from_request_parts(
    parts: &mut Parts,
    ctx: &ServerState,
) -> Option<Session> {
    if !ctx.config.auth_enabled {
        return Some(Session {
            principal: Principal::anonymous(),
        });
    }

    // Header, then query parameter, then cookie.
    let token = match extract_token_from_headers(parts)
        .or_else(|| extract_token_from_query(parts))
    {
        Some(token) => Some(token),
        None => extract_token_from_cookies(parts, ctx).await,
    };

    let token = match token {
        None => {
            debug!("No token in headers, query nor cookies.");
            return None;
        }
        Some(x) => x,
    };

    match ctx.token_authority.verify(&token) {
        Ok(principal) => Some(Session { principal }),
        Err(err) => {
            debug!("Token verification failed: {}", err);
            None
        }
    }
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session_from_request_parts(parts, ctx)
            .await
            .ok_or(SessionExtractionError::AccessDenied)
    }
}
