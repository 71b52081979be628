//! Journey domain events.

use chrono::{DateTime, Utc};
use event_bus::DomainEvent;
use serde::{Deserialize, Serialize};

use crate::aggregate::EventPayload;
use crate::mascot::Mascot;

use super::{ConfidenceLevel, Phase, Preferences};

/// Events recorded by a [`UserJourney`](super::UserJourney).
///
/// Serializes to the bare data object; the variant name is carried as the
/// record's event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JourneyEvent {
    /// A lesson was completed for the first time.
    LessonCompleted(LessonCompletedData),

    /// An achievement was added to the journey.
    AchievementUnlocked(AchievementUnlockedData),

    /// The journey moved to its next phase.
    PhaseAdvanced(PhaseAdvancedData),

    /// A feature was unlocked outside of a phase change.
    FeatureUnlocked(FeatureUnlockedData),

    /// One or more preferences changed.
    PreferencesUpdated(PreferencesUpdatedData),

    /// The behaviour profile absorbed a new observation.
    BehaviorProfileUpdated(BehaviorProfileUpdatedData),
}

impl JourneyEvent {
    pub const LESSON_COMPLETED: &'static str = "LessonCompleted";
    pub const ACHIEVEMENT_UNLOCKED: &'static str = "AchievementUnlocked";
    pub const PHASE_ADVANCED: &'static str = "PhaseAdvanced";
    pub const FEATURE_UNLOCKED: &'static str = "FeatureUnlocked";
    pub const PREFERENCES_UPDATED: &'static str = "PreferencesUpdated";
    pub const BEHAVIOR_PROFILE_UPDATED: &'static str = "BehaviorProfileUpdated";

    /// Decodes a published record back into a typed journey event.
    ///
    /// Returns `None` when the record is not a journey event.
    pub fn from_domain_event(event: &DomainEvent) -> Option<Result<Self, serde_json::Error>> {
        let decoded = match event.event_type() {
            Self::LESSON_COMPLETED => event.data_as().map(JourneyEvent::LessonCompleted),
            Self::ACHIEVEMENT_UNLOCKED => event.data_as().map(JourneyEvent::AchievementUnlocked),
            Self::PHASE_ADVANCED => event.data_as().map(JourneyEvent::PhaseAdvanced),
            Self::FEATURE_UNLOCKED => event.data_as().map(JourneyEvent::FeatureUnlocked),
            Self::PREFERENCES_UPDATED => event.data_as().map(JourneyEvent::PreferencesUpdated),
            Self::BEHAVIOR_PROFILE_UPDATED => {
                event.data_as().map(JourneyEvent::BehaviorProfileUpdated)
            }
            _ => return None,
        };
        Some(decoded)
    }
}

impl EventPayload for JourneyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            JourneyEvent::LessonCompleted(_) => Self::LESSON_COMPLETED,
            JourneyEvent::AchievementUnlocked(_) => Self::ACHIEVEMENT_UNLOCKED,
            JourneyEvent::PhaseAdvanced(_) => Self::PHASE_ADVANCED,
            JourneyEvent::FeatureUnlocked(_) => Self::FEATURE_UNLOCKED,
            JourneyEvent::PreferencesUpdated(_) => Self::PREFERENCES_UPDATED,
            JourneyEvent::BehaviorProfileUpdated(_) => Self::BEHAVIOR_PROFILE_UPDATED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletedData {
    pub lesson_id: String,
    /// Lessons completed including this one.
    pub total_completed: usize,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlockedData {
    pub achievement_id: String,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseAdvancedData {
    pub from_phase: Phase,
    pub to_phase: Phase,
    pub from_mascot: Mascot,
    pub to_mascot: Mascot,
    pub confidence_level: ConfidenceLevel,

    /// Features that became available with this phase.
    pub unlocked_features: Vec<String>,

    /// The `phase_{n}_unlocked` achievement granted with the advance.
    pub achievement_id: String,

    pub advanced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureUnlockedData {
    pub feature_id: String,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdatedData {
    pub changed_fields: Vec<String>,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorProfileUpdatedData {
    pub interaction_count: u64,
    pub average_session_duration: f64,
    pub learning_style: Option<String>,
}
