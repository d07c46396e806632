//! Signed bearer credentials
//!
//! Credentials are stateless HS256 JWTs embedding the principal and an
//! expiry; nothing is persisted server-side.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::principal::Principal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential")]
    Invalid,
    #[error("credential expired")]
    Expired,
    #[error("invalid username or password")]
    InvalidCredentials,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    username: String,
    roles: Vec<String>,
    iat: u64,
    exp: u64,
}

/// Issues and verifies bearer credentials with a fixed signing key.
pub struct TokenAuthority {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl TokenAuthority {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| AuthError::Invalid)?
            .as_secs();
        let claims = Claims {
            sub: principal.id.clone(),
            username: principal.username.clone(),
            roles: principal.roles.clone(),
            iat: now,
            exp: now + self.lifetime.as_secs(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(|_| AuthError::Invalid)
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).map_err(
            |err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            },
        )?;
        Ok(Principal {
            id: data.claims.sub,
            username: data.claims.username,
            roles: data.claims.roles,
        })
    }
}
