//! Middleware run in sequence before handler dispatch.

use async_trait::async_trait;

use crate::event::DomainEvent;
use crate::handler::HandlerError;

/// A step in the publish pipeline.
///
/// Middleware may pass the event through unchanged, replace it with a new
/// event, or reject it. A rejection aborts the publish before any handler
/// runs.
#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, event: DomainEvent) -> Result<DomainEvent, HandlerError>;
}

/// Emits a debug span entry for every event passing through the bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    async fn process(&self, event: DomainEvent) -> Result<DomainEvent, HandlerError> {
        tracing::debug!(
            event_id = %event.event_id(),
            event_type = event.event_type(),
            aggregate_id = %event.aggregate_id(),
            "event entering bus"
        );
        Ok(event)
    }
}
