use axum::extract::FromRef;

use crate::auth::{CredentialStore, TokenAuthority};
use crate::mcp::Dispatcher;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedDispatcher = Arc<Dispatcher>;
pub type GuardedTokenAuthority = Arc<TokenAuthority>;
pub type GuardedCredentialStore = Arc<dyn CredentialStore>;
pub type GuardedRateLimiter = Arc<RateLimiter>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub dispatcher: GuardedDispatcher,
    pub token_authority: GuardedTokenAuthority,
    pub credential_store: GuardedCredentialStore,
    pub rate_limiter: GuardedRateLimiter,
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedDispatcher {
    fn from_ref(input: &ServerState) -> Self {
        input.dispatcher.clone()
    }
}

impl FromRef<ServerState> for GuardedTokenAuthority {
    fn from_ref(input: &ServerState) -> Self {
        input.token_authority.clone()
    }
}

impl FromRef<ServerState> for GuardedCredentialStore {
    fn from_ref(input: &ServerState) -> Self {
        input.credential_store.clone()
    }
}

impl FromRef<ServerState> for GuardedRateLimiter {
    fn from_ref(input: &ServerState) -> Self {
        input.rate_limiter.clone()
    }
}
