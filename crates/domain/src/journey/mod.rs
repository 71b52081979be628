//! User journey aggregate and related types.

mod aggregate;
mod behavior;
mod events;
mod phase;
mod preferences;
mod service;

pub use aggregate::{JourneyProgress, JourneySnapshot, LESSON_MILESTONES, UserJourney};
pub use behavior::{BehaviorProfile, BehaviorUpdate};
pub use events::{
    AchievementUnlockedData, BehaviorProfileUpdatedData, FeatureUnlockedData, JourneyEvent,
    LessonCompletedData, PhaseAdvancedData, PreferencesUpdatedData,
};
pub use phase::{ConfidenceLevel, InvalidPhase, Phase, PhaseRequirements};
pub use preferences::{Preferences, RiskTolerance, Theme};
pub use service::JourneyService;

use event_bus::EventBusError;
use thiserror::Error;

/// Errors that can occur during journey operations.
#[derive(Debug, Error)]
pub enum JourneyError {
    /// Malformed input.
    #[error("Invalid journey input: {0}")]
    Validation(String),

    /// The journey is already in the terminal phase.
    #[error("Already at highest phase ({0})")]
    AlreadyAtHighestPhase(Phase),

    /// The gate for the next phase is not met.
    #[error(
        "Requirements not met for phase {target}: {lessons_completed}/{lessons_required} lessons, requires achievement '{required_achievement}'"
    )]
    RequirementsNotMet {
        target: Phase,
        lessons_completed: usize,
        lessons_required: usize,
        required_achievement: &'static str,
    },

    /// The lesson was completed before.
    #[error("Lesson already completed: {0}")]
    LessonAlreadyCompleted(String),

    /// A snapshot could not be decoded.
    #[error("Invalid journey snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Recording an event failed.
    #[error("Event error: {0}")]
    Event(#[from] EventBusError),
}

impl JourneyError {
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            JourneyError::AlreadyAtHighestPhase(_)
                | JourneyError::RequirementsNotMet { .. }
                | JourneyError::LessonAlreadyCompleted(_)
        )
    }
}
