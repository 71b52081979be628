//! Handler trait, subscription identifiers and options.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::event::DomainEvent;

/// Event type that matches every published event.
pub const WILDCARD: &str = "*";

/// Identifier returned by [`EventBus::subscribe`](crate::EventBus::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure reported by a single handler invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self(format!("payload error: {e}"))
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// A subscriber to domain events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one event. Errors are recorded against this handler only.
    async fn handle(&self, event: &DomainEvent) -> HandlerResult;

    /// Name used in logs and handler outcomes.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Adapter turning an async closure into an [`EventHandler`].
pub struct FnHandler<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F, Fut>
where
    F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, event: &DomainEvent) -> HandlerResult {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        "fn_handler"
    }
}

/// Wraps an async closure as a shareable handler.
///
/// ```ignore
/// let handler = handler_fn(|event| async move {
///     tracing::info!(event_type = event.event_type(), "seen");
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(DomainEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(FnHandler {
        f,
        _marker: PhantomData,
    })
}

/// Options accepted by [`EventBus::subscribe`](crate::EventBus::subscribe).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Higher priorities run first. Ties keep subscription order.
    pub priority: i32,

    /// Remove the subscription after its first invocation.
    pub once: bool,
}

impl SubscribeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handler_fn_forwards_to_closure() {
        let handler = handler_fn(|event: DomainEvent| async move {
            if event.event_type() == "Bad" {
                Err(HandlerError::new("bad event"))
            } else {
                Ok(())
            }
        });

        let ok = DomainEvent::builder()
            .event_type("Good")
            .aggregate_id("a")
            .build()
            .unwrap();
        let bad = DomainEvent::builder()
            .event_type("Bad")
            .aggregate_id("a")
            .build()
            .unwrap();

        assert!(handler.handle(&ok).await.is_ok());
        assert_eq!(
            handler.handle(&bad).await,
            Err(HandlerError::new("bad event"))
        );
    }

    #[test]
    fn subscribe_options_builder() {
        let options = SubscribeOptions::new().priority(5).once();
        assert_eq!(options.priority, 5);
        assert!(options.once);
        assert_eq!(SubscribeOptions::default().priority, 0);
    }
}
