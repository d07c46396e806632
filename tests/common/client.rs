//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with helpers for every endpoint of the gateway. When API
//! routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Bearer token attached to requests when set
    token: Option<String>,
}

impl TestClient {
    /// Creates a new unauthenticated client
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle the token cookie
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Creates a client pre-authenticated as the configured admin.
    ///
    /// # Panics
    ///
    /// Panics if authentication fails (indicates test infrastructure problem).
    pub async fn authenticated(base_url: String) -> Self {
        let mut client = Self::new(base_url);

        let response = client.login(ADMIN_USER, ADMIN_PASS).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "Admin authentication failed: {:?}",
            response.text().await
        );

        client
    }

    /// Like `authenticated`, but also remembers the bearer token so requests
    /// carry an Authorization header instead of relying on the cookie.
    pub async fn authenticated_with_bearer(base_url: String) -> Self {
        let mut client = Self::new(base_url);

        let response = client.login(ADMIN_USER, ADMIN_PASS).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("Login response is not JSON");
        client.token = Some(
            body["token"]
                .as_str()
                .expect("Login response missing token")
                .to_string(),
        );

        client
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /auth/login
    pub async fn login(&mut self, username: &str, password: &str) -> Response {
        self.client
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("Login request failed")
    }

    // ========================================================================
    // MCP Endpoints
    // ========================================================================

    /// POST /mcp with a raw body
    pub async fn mcp_raw(&self, body: String) -> Response {
        let mut request = self.client.post(format!("{}/mcp", self.base_url)).body(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("MCP request failed")
    }

    /// POST /mcp with a JSON-RPC envelope
    pub async fn mcp(&self, envelope: Value) -> Value {
        let response = self.mcp_raw(envelope.to_string()).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::OK,
            "MCP transport must answer 200"
        );
        response.json().await.expect("MCP response is not JSON")
    }

    /// POST /mcp calling `method` with `params`
    pub async fn mcp_call(&self, id: u64, method: &str, params: Option<Value>) -> Value {
        let mut envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
        });
        if let Some(params) = params {
            envelope["params"] = params;
        }
        self.mcp(envelope).await
    }

    /// POST /mcp invoking a tool via tools/call
    pub async fn tool_call(&self, name: &str, arguments: Value) -> Value {
        self.mcp_call(
            1,
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        )
        .await
    }

    /// GET /mcp/sse (does not consume the stream)
    pub async fn open_sse(&self) -> Response {
        let mut request = self.client.get(format!("{}/mcp/sse", self.base_url));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("SSE request failed")
    }

    // ========================================================================
    // Pass-through / System Endpoints
    // ========================================================================

    /// Request against /api/k8s/{path}
    pub async fn k8s_passthrough(&self, method: reqwest::Method, path: &str) -> Response {
        let mut request = self
            .client
            .request(method, format!("{}/api/k8s/{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Pass-through request failed")
    }

    /// GET /health
    pub async fn health(&self) -> Response {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .expect("Health request failed")
    }
}
