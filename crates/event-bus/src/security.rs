//! Security boundary consulted by the bus and the domain services.
//!
//! Only the interface lives here; credential checks and rate limiting are
//! supplied by the embedding application.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a [`SecurityContext`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecurityError {
    /// The caller may not perform the action on the resource.
    #[error("{user} is not authorized to {action} {resource}")]
    Unauthorized {
        user: String,
        action: String,
        resource: String,
    },

    /// Credentials were rejected.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Too many requests from the same caller.
    #[error("Rate limit exceeded for {0}")]
    RateLimited(String),
}

impl SecurityError {
    /// Convenience constructor for [`SecurityError::Unauthorized`].
    pub fn unauthorized(
        user: Option<&str>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self::Unauthorized {
            user: user.unwrap_or("anonymous").to_string(),
            action: action.into(),
            resource: resource.into(),
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub roles: Vec<String>,
}

/// Authorization seam for subscribe/publish and domain actions.
#[async_trait]
pub trait SecurityContext: Send + Sync {
    /// Verifies a credential and returns the authenticated principal.
    async fn authenticate_user(
        &self,
        user_id: &str,
        credential: &str,
    ) -> Result<Principal, SecurityError>;

    /// Checks whether `user_id` (or an anonymous caller) may perform
    /// `action` on `resource`.
    async fn validate_user_action(
        &self,
        user_id: Option<&str>,
        action: &str,
        resource: &str,
    ) -> Result<(), SecurityError>;
}
