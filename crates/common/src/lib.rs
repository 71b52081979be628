//! Shared identifier types used across the event bus and the domain crates.

pub mod types;

pub use types::{AggregateId, EventId};
