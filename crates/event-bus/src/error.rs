use thiserror::Error;

use crate::security::SecurityError;

/// Errors surfaced by the event bus to its caller.
///
/// Handler failures are deliberately absent: they are captured per handler in
/// the [`PublishResult`](crate::PublishResult) and never fail a publish.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// The subscription or event was malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The security context refused the action.
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    /// A middleware rejected the event before dispatch.
    #[error("Middleware '{middleware}' rejected event: {reason}")]
    Middleware { middleware: String, reason: String },

    /// An event payload could not be converted to JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventBusError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, EventBusError>;
