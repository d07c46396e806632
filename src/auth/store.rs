//! Credential store
//!
//! Supplies the fixed principal that password login authenticates against.
//! Persistence is out of scope; the store is built once at startup from
//! configuration.

use anyhow::Result;
use tracing::debug;

use super::password::PasswordHasher;
use super::principal::Principal;
use super::token::AuthError;

pub trait CredentialStore: Send + Sync {
    /// Exchange username/password for a principal.
    ///
    /// Fails with `AuthError::InvalidCredentials` uniformly whether the
    /// username or the password was wrong.
    fn login(&self, username: &str, password: &str) -> Result<Principal, AuthError>;
}

/// Single fixed principal, password checked against an argon2 hash.
pub struct StaticCredentialStore {
    principal: Principal,
    password_hash: String,
    /// Hash compared against when the username is unknown, so a mismatching
    /// username costs the same as a mismatching password.
    decoy_hash: String,
    hasher: PasswordHasher,
}

impl StaticCredentialStore {
    pub fn new(principal: Principal, password: &str, hasher: PasswordHasher) -> Result<Self> {
        let password_hash = hasher.hash(password)?;
        let decoy_hash = hasher.hash("decoy-password-never-matches")?;
        Ok(Self {
            principal,
            password_hash,
            decoy_hash,
            hasher,
        })
    }
}

impl CredentialStore for StaticCredentialStore {
    fn login(&self, username: &str, password: &str) -> Result<Principal, AuthError> {
        let (target_hash, username_matches) = if username == self.principal.username {
            (&self.password_hash, true)
        } else {
            (&self.decoy_hash, false)
        };

        let password_matches = self
            .hasher
            .verify(password, target_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if username_matches && password_matches {
            debug!("Login succeeded for user {}", self.principal.username);
            Ok(self.principal.clone())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}
