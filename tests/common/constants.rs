//! Shared constants for end-to-end tests

/// Credentials of the single configured principal.
pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASS: &str = "admin123";

/// Signing key used by test servers.
pub const TEST_JWT_SECRET: &str = "e2e-test-secret";

/// How long to wait for a spawned server to answer its health check.
pub const SERVER_READY_TIMEOUT_MS: u64 = 5_000;
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Per-request timeout for the test client.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
