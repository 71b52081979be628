//! Domain layer of the learning-journey core.
//!
//! This crate provides:
//! - [`AggregateRoot`] and the [`Aggregate`] trait for entities that record
//!   domain events
//! - [`UserJourney`], the four-phase progression state machine
//! - [`Experiment`], deterministic A/B variant assignment
//! - Repository, storage and performance-monitor seams, plus the services
//!   that tie aggregates to the [`event_bus::EventBus`]

pub mod aggregate;
pub mod command;
pub mod error;
pub mod experiment;
pub mod journey;
pub mod mascot;
pub mod monitor;
pub mod repository;

pub use aggregate::{Aggregate, AggregateRoot, EventPayload};
pub use command::{CommandHandler, CommandResult};
pub use error::DomainError;
pub use experiment::{
    Assignment, Experiment, ExperimentConfig, ExperimentError, ExperimentEvent,
    ExperimentService, ExperimentSnapshot, ExperimentStatus, TargetingRules, Variant,
};
pub use journey::{
    BehaviorProfile, BehaviorUpdate, ConfidenceLevel, JourneyError, JourneyEvent,
    JourneyProgress, JourneyService, JourneySnapshot, Phase, Preferences, RiskTolerance, Theme,
    UserJourney,
};
pub use mascot::{Mascot, MascotPersonality, render_template};
pub use monitor::{MetricsMonitor, OperationSample, PerformanceMonitor, RecordingMonitor};
pub use repository::{
    InMemoryStorage, KeyValueStorage, Persistable, Repository, RepositoryError,
    RepositoryFilter, StorageRepository,
};
