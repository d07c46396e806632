//! Authentication and authorization
//!
//! Stateless bearer-token auth: a signed JWT carries the principal, every
//! request re-verifies from scratch. Password login is backed by a fixed
//! credential store (single configured principal).

pub mod password;
pub mod principal;
pub mod store;
pub mod token;

pub use password::PasswordHasher;
pub use principal::{Principal, SUPER_ROLE};
pub use store::{CredentialStore, StaticCredentialStore};
pub use token::{AuthError, TokenAuthority};
