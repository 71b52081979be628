//! Demo wiring for the learning journey core.
//!
//! Builds an in-process [`EventBus`](event_bus::EventBus), puts the journey
//! and experiment services on top of shared in-memory storage, and drives a
//! single learner through a scripted session.

pub mod config;
pub mod demo;
pub mod error;

pub use config::{Config, LogFormat};
pub use demo::{DemoSummary, build_bus, run};
pub use error::AppError;
