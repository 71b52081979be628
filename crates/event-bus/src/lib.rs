//! In-process publish/subscribe routing for domain events.
//!
//! This crate provides:
//! - [`DomainEvent`], the immutable event record shared by every aggregate
//! - [`EventBus`], which fans events out to prioritised, time-boxed handlers
//! - [`Middleware`] and [`SecurityContext`] seams consulted before dispatch
//! - A bounded [`EventHistory`] ring buffer and running [`BusStats`]

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod history;
pub mod middleware;
pub mod security;
pub mod stats;

pub use bus::{EventBus, HandlerOutcome, PublishOptions, PublishResult, PublishStatus};
pub use common::{AggregateId, EventId};
pub use config::EventBusConfig;
pub use error::{EventBusError, Result};
pub use event::{DomainEvent, DomainEventBuilder, EventData, SCHEMA_VERSION};
pub use handler::{
    EventHandler, HandlerError, HandlerResult, SubscribeOptions, SubscriptionId, WILDCARD,
    handler_fn,
};
pub use history::{EventHistory, HistoryFilter};
pub use middleware::{LoggingMiddleware, Middleware};
pub use security::{Principal, SecurityContext, SecurityError};
pub use stats::{BusStats, HandlerStats};
