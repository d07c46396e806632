use serde::{Deserialize, Serialize};
use tracing::warn;

/// Role that satisfies every authorization check.
pub const SUPER_ROLE: &str = "admin";

/// Authenticated identity derived from a verified credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    /// Principal used when authentication is administratively disabled.
    /// Carries the super-role so the pass-through mode never trips a role
    /// check downstream.
    pub fn anonymous() -> Self {
        Principal {
            id: "anonymous".to_string(),
            username: "anonymous".to_string(),
            roles: vec![SUPER_ROLE.to_string()],
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Allow iff `required_roles` is empty, the principal holds any required
    /// role, or holds the super-role. Denials are logged with the principal
    /// and the roles that were required.
    pub fn authorize(&self, required_roles: &[&str]) -> bool {
        if required_roles.is_empty() || self.has_role(SUPER_ROLE) {
            return true;
        }
        if required_roles.iter().any(|role| self.has_role(role)) {
            return true;
        }
        warn!(
            "Authorization denied for user {} (roles: {:?}, required: {:?})",
            self.username, self.roles, required_roles
        );
        false
    }
}
