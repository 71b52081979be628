//! Top-level error for the demo binary.

use domain::DomainError;
use event_bus::EventBusError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    EventBus(#[from] EventBusError),

    #[error("failed to render summary: {0}")]
    Summary(#[from] serde_json::Error),
}
