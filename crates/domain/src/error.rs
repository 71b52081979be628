//! Domain error types.

use event_bus::{EventBusError, SecurityError};
use thiserror::Error;

use crate::experiment::ExperimentError;
use crate::journey::JourneyError;
use crate::repository::RepositoryError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input to a service call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The security context refused the action.
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    /// A journey business rule was violated.
    #[error("Journey error: {0}")]
    Journey(#[from] JourneyError),

    /// An experiment business rule was violated.
    #[error("Experiment error: {0}")]
    Experiment(#[from] ExperimentError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// The repository failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The event bus refused to publish.
    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),
}

impl DomainError {
    /// Returns true for rejections caused by business rules, as opposed to
    /// infrastructure or input failures.
    pub fn is_business_rule(&self) -> bool {
        match self {
            DomainError::Journey(e) => e.is_business_rule(),
            DomainError::Experiment(e) => e.is_business_rule(),
            _ => false,
        }
    }
}
