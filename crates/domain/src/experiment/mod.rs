//! Experiment aggregate and related types.

mod aggregate;
mod events;
mod hashing;
mod service;
mod status;
mod variant;

pub use aggregate::{Experiment, ExperimentConfig, ExperimentSnapshot};
pub use events::{
    ConversionRecordedData, ExperimentEvent, ExperimentStartedData, ExperimentStoppedData,
    UserAssignedData, VariantAddedData,
};
pub use hashing::hash_to_unit;
pub use service::ExperimentService;
pub use status::ExperimentStatus;
pub use variant::{Assignment, TargetingRules, Variant};

use event_bus::EventBusError;
use thiserror::Error;

/// Errors that can occur during experiment operations.
#[derive(Debug, Error)]
pub enum ExperimentError {
    /// Malformed configuration or input.
    #[error("Invalid experiment input: {0}")]
    Validation(String),

    /// The experiment is not in the expected status.
    #[error("Invalid state transition: cannot {action} from {current_status} status")]
    InvalidStateTransition {
        current_status: ExperimentStatus,
        action: &'static str,
    },

    /// Starting requires at least two variants.
    #[error("Experiment needs at least 2 variants to start, has {count}")]
    NotEnoughVariants { count: usize },

    /// A variant id is used twice.
    #[error("Duplicate variant: {0}")]
    DuplicateVariant(String),

    /// The experiment is not running.
    #[error("Experiment is not active (status: {0})")]
    NotActive(ExperimentStatus),

    /// The user is not part of the experiment.
    #[error("User is not assigned to this experiment: {0}")]
    UserNotAssigned(String),

    /// A snapshot could not be decoded.
    #[error("Invalid experiment snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Recording an event failed.
    #[error("Event error: {0}")]
    Event(#[from] EventBusError),
}

impl ExperimentError {
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            ExperimentError::InvalidStateTransition { .. }
                | ExperimentError::NotEnoughVariants { .. }
                | ExperimentError::DuplicateVariant(_)
                | ExperimentError::NotActive(_)
                | ExperimentError::UserNotAssigned(_)
        )
    }
}
