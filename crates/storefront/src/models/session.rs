//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use roastline_core::UserId;

/// Session-stored user identity.
///
/// Holds the backend-issued bearer token for the lifetime of the session,
/// so `Debug` is implemented manually to keep it out of logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's backend ID.
    pub id: UserId,
    /// Username shown in the header.
    pub username: String,
    /// Bearer token sent with authenticated backend calls.
    access_token: String,
}

impl CurrentUser {
    /// Create a session identity from a successful login.
    #[must_use]
    pub fn new(id: UserId, username: String, access_token: String) -> Self {
        Self {
            id,
            username,
            access_token,
        }
    }

    /// The bearer token for backend calls.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_access_token() {
        let user = CurrentUser::new(
            UserId::new(7),
            "casey".to_string(),
            "super_secret_bearer_token".to_string(),
        );
        let debug_output = format!("{user:?}");
        assert!(debug_output.contains("casey"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer_token"));
    }
}
