//! UserJourney aggregate implementation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::mascot::Mascot;
use crate::repository::{Persistable, RepositoryError};

use super::events::{
    AchievementUnlockedData, BehaviorProfileUpdatedData, FeatureUnlockedData,
    LessonCompletedData, PhaseAdvancedData, PreferencesUpdatedData,
};
use super::{
    BehaviorProfile, BehaviorUpdate, ConfidenceLevel, JourneyError, JourneyEvent, Phase,
    Preferences,
};

/// Achievements granted when the number of completed lessons reaches a
/// threshold.
pub const LESSON_MILESTONES: [(usize, &str); 5] = [
    (1, "first_lesson_completed"),
    (3, "learning_momentum"),
    (5, "dedicated_learner"),
    (10, "knowledge_seeker"),
    (20, "investment_scholar"),
];

/// A user's progression through the four learning phases.
///
/// Identified by the user id. `version` grows by exactly one for every
/// mutating call that changes state; idempotent no-ops leave it untouched.
#[derive(Debug, Clone)]
pub struct UserJourney {
    root: AggregateRoot,
    user_id: String,
    version: u64,
    current_phase: Phase,
    confidence_level: ConfidenceLevel,
    achievements: BTreeSet<String>,
    completed_lessons: BTreeSet<String>,
    unlocked_features: BTreeSet<String>,
    preferences: Preferences,
    behavior_profile: BehaviorProfile,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Durable form of a [`UserJourney`]. Never carries uncommitted events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySnapshot {
    pub user_id: String,
    pub version: u64,
    pub current_phase: Phase,
    pub confidence_level: ConfidenceLevel,
    #[serde(default)]
    pub achievements: BTreeSet<String>,
    #[serde(default)]
    pub completed_lessons: BTreeSet<String>,
    #[serde(default)]
    pub unlocked_features: BTreeSet<String>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub behavior_profile: BehaviorProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a journey stands relative to its next phase gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyProgress {
    pub current_phase: Phase,
    pub next_phase: Option<Phase>,
    pub lessons_completed: usize,
    pub lessons_required: Option<usize>,
    pub missing_achievement: Option<String>,
    pub can_advance: bool,
}

impl Aggregate for UserJourney {
    fn aggregate_type() -> &'static str {
        "UserJourney"
    }

    fn root(&self) -> &AggregateRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut AggregateRoot {
        &mut self.root
    }
}

impl Persistable for UserJourney {
    fn version(&self) -> u64 {
        self.version
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        UserJourney::to_json(self)
    }

    fn from_json(value: Value) -> Result<Self, RepositoryError> {
        UserJourney::from_json(value).map_err(|e| match e {
            JourneyError::Snapshot(e) => RepositoryError::Serialization(e),
            other => RepositoryError::Corrupted(other.to_string()),
        })
    }
}

impl UserJourney {
    /// Starts a journey at phase one with the phase-one features unlocked.
    pub fn new(user_id: impl Into<String>) -> Result<Self, JourneyError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(JourneyError::Validation("user id is required".to_string()));
        }

        let now = Utc::now();
        let phase = Phase::One;
        Ok(Self {
            root: AggregateRoot::new(user_id.as_str()),
            user_id,
            version: 0,
            current_phase: phase,
            confidence_level: phase.confidence(),
            achievements: BTreeSet::new(),
            completed_lessons: BTreeSet::new(),
            unlocked_features: phase.features().iter().map(|f| f.to_string()).collect(),
            preferences: Preferences::default(),
            behavior_profile: BehaviorProfile::default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn to_snapshot(&self) -> JourneySnapshot {
        JourneySnapshot {
            user_id: self.user_id.clone(),
            version: self.version,
            current_phase: self.current_phase,
            confidence_level: self.confidence_level,
            achievements: self.achievements.clone(),
            completed_lessons: self.completed_lessons.clone(),
            unlocked_features: self.unlocked_features.clone(),
            preferences: self.preferences.clone(),
            behavior_profile: self.behavior_profile.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Rebuilds a journey from a snapshot. Confidence is re-derived from the
    /// phase so the two can never disagree.
    pub fn from_snapshot(snapshot: JourneySnapshot) -> Result<Self, JourneyError> {
        if snapshot.user_id.trim().is_empty() {
            return Err(JourneyError::Validation(
                "snapshot is missing a user id".to_string(),
            ));
        }

        Ok(Self {
            root: AggregateRoot::restored(snapshot.user_id.as_str(), snapshot.version),
            user_id: snapshot.user_id,
            version: snapshot.version,
            current_phase: snapshot.current_phase,
            confidence_level: snapshot.current_phase.confidence(),
            achievements: snapshot.achievements,
            completed_lessons: snapshot.completed_lessons,
            unlocked_features: snapshot.unlocked_features,
            preferences: snapshot.preferences,
            behavior_profile: snapshot.behavior_profile,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.to_snapshot())
    }

    pub fn from_json(value: Value) -> Result<Self, JourneyError> {
        let snapshot: JourneySnapshot = serde_json::from_value(value)?;
        Self::from_snapshot(snapshot)
    }
}

// Query methods
impl UserJourney {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        self.confidence_level
    }

    pub fn current_mascot(&self) -> Mascot {
        self.current_phase.mascot()
    }

    pub fn achievements(&self) -> &BTreeSet<String> {
        &self.achievements
    }

    pub fn has_achievement(&self, achievement_id: &str) -> bool {
        self.achievements.contains(achievement_id)
    }

    pub fn completed_lessons(&self) -> &BTreeSet<String> {
        &self.completed_lessons
    }

    pub fn unlocked_features(&self) -> &BTreeSet<String> {
        &self.unlocked_features
    }

    pub fn has_feature(&self, feature_id: &str) -> bool {
        self.unlocked_features.contains(feature_id)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn behavior_profile(&self) -> &BehaviorProfile {
        &self.behavior_profile
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn progress(&self) -> JourneyProgress {
        let next_phase = self.current_phase.next();
        let requirements = next_phase.and_then(Phase::entry_requirements);
        let missing_achievement = requirements
            .filter(|req| !self.achievements.contains(req.achievement))
            .map(|req| req.achievement.to_string());

        JourneyProgress {
            current_phase: self.current_phase,
            next_phase,
            lessons_completed: self.completed_lessons.len(),
            lessons_required: requirements.map(|req| req.min_lessons),
            missing_achievement,
            can_advance: self.can_advance_to_next_phase(),
        }
    }

    pub fn can_advance_to_next_phase(&self) -> bool {
        match self.current_phase.next() {
            None => false,
            Some(next) => next
                .entry_requirements()
                .is_none_or(|req| req.is_met(self.completed_lessons.len(), &self.achievements)),
        }
    }
}

// Command methods
impl UserJourney {
    /// Moves the journey to the next phase if its entry gate is met.
    ///
    /// On success the phase features are unlocked, the `phase_{n}_unlocked`
    /// achievement is granted and a single `PhaseAdvanced` event is recorded.
    pub fn advance_to_next_phase(&mut self) -> Result<Phase, JourneyError> {
        let from = self.current_phase;
        let next = from
            .next()
            .ok_or(JourneyError::AlreadyAtHighestPhase(from))?;

        if let Some(req) = next.entry_requirements()
            && !req.is_met(self.completed_lessons.len(), &self.achievements)
        {
            return Err(JourneyError::RequirementsNotMet {
                target: next,
                lessons_completed: self.completed_lessons.len(),
                lessons_required: req.min_lessons,
                required_achievement: req.achievement,
            });
        }

        let now = Utc::now();
        let unlocked_features: Vec<String> = next
            .features()
            .iter()
            .filter(|f| !self.unlocked_features.contains(**f))
            .map(|f| f.to_string())
            .collect();
        let achievement_id = next.unlock_achievement();

        self.record(JourneyEvent::PhaseAdvanced(PhaseAdvancedData {
            from_phase: from,
            to_phase: next,
            from_mascot: from.mascot(),
            to_mascot: next.mascot(),
            confidence_level: next.confidence(),
            unlocked_features: unlocked_features.clone(),
            achievement_id: achievement_id.clone(),
            advanced_at: now,
        }))?;

        self.current_phase = next;
        self.confidence_level = next.confidence();
        self.unlocked_features.extend(unlocked_features);
        self.achievements.insert(achievement_id);
        self.touch(now);

        tracing::info!(user_id = %self.user_id, from = %from, to = %next, "journey advanced");
        Ok(next)
    }

    /// Marks a lesson as completed and grants any lesson milestones reached.
    ///
    /// Completing the same lesson twice is an error. Returns the achievements
    /// unlocked by this call.
    pub fn complete_lesson(&mut self, lesson_id: &str) -> Result<Vec<String>, JourneyError> {
        let lesson_id = non_blank(lesson_id, "lesson id")?;
        if self.completed_lessons.contains(lesson_id) {
            return Err(JourneyError::LessonAlreadyCompleted(lesson_id.to_string()));
        }

        let now = Utc::now();
        let total_completed = self.completed_lessons.len() + 1;
        self.record(JourneyEvent::LessonCompleted(LessonCompletedData {
            lesson_id: lesson_id.to_string(),
            total_completed,
            completed_at: now,
        }))?;

        self.completed_lessons.insert(lesson_id.to_string());
        self.behavior_profile.record_interaction();

        let mut unlocked = Vec::new();
        for (threshold, achievement) in LESSON_MILESTONES {
            if total_completed >= threshold && self.grant_achievement(achievement, now)? {
                unlocked.push(achievement.to_string());
            }
        }

        self.touch(now);
        Ok(unlocked)
    }

    /// Adds an achievement. Returns `false` without recording anything if
    /// the journey already has it.
    pub fn add_achievement(&mut self, achievement_id: &str) -> Result<bool, JourneyError> {
        let achievement_id = non_blank(achievement_id, "achievement id")?;
        let now = Utc::now();
        let added = self.grant_achievement(achievement_id, now)?;
        if added {
            self.touch(now);
        }
        Ok(added)
    }

    /// Unlocks a feature. Returns `false` if it was already unlocked.
    pub fn unlock_feature(&mut self, feature_id: &str) -> Result<bool, JourneyError> {
        let feature_id = non_blank(feature_id, "feature id")?;
        if self.unlocked_features.contains(feature_id) {
            return Ok(false);
        }

        let now = Utc::now();
        self.record(JourneyEvent::FeatureUnlocked(FeatureUnlockedData {
            feature_id: feature_id.to_string(),
            unlocked_at: now,
        }))?;
        self.unlocked_features.insert(feature_id.to_string());
        self.touch(now);
        Ok(true)
    }

    /// Merges a JSON object of preference fields.
    ///
    /// Invalid fields are dropped. Returns `false` when nothing changed, in
    /// which case no event is recorded.
    pub fn update_preferences(&mut self, patch: &Value) -> Result<bool, JourneyError> {
        let patch = patch.as_object().ok_or_else(|| {
            JourneyError::Validation("preferences patch must be a JSON object".to_string())
        })?;

        let mut preferences = self.preferences.clone();
        let changed = preferences.apply_patch(patch);
        if changed.is_empty() {
            return Ok(false);
        }

        self.record(JourneyEvent::PreferencesUpdated(PreferencesUpdatedData {
            changed_fields: changed.iter().map(|f| f.to_string()).collect(),
            preferences: preferences.clone(),
        }))?;
        self.preferences = preferences;
        self.touch(Utc::now());
        Ok(true)
    }

    /// Folds a behaviour observation into the profile. Returns `false` when
    /// the observation changed nothing.
    pub fn update_behavior_profile(
        &mut self,
        update: &BehaviorUpdate,
    ) -> Result<bool, JourneyError> {
        update.validate().map_err(JourneyError::Validation)?;

        let mut profile = self.behavior_profile.clone();
        if !profile.apply(update).map_err(JourneyError::Validation)? {
            return Ok(false);
        }

        self.record(JourneyEvent::BehaviorProfileUpdated(BehaviorProfileUpdatedData {
            interaction_count: profile.interaction_count,
            average_session_duration: profile.average_session_duration,
            learning_style: profile.learning_style.clone(),
        }))?;
        self.behavior_profile = profile;
        self.touch(Utc::now());
        Ok(true)
    }
}

// Internal helpers
impl UserJourney {
    fn grant_achievement(
        &mut self,
        achievement_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, JourneyError> {
        if self.achievements.contains(achievement_id) {
            return Ok(false);
        }

        self.record(JourneyEvent::AchievementUnlocked(AchievementUnlockedData {
            achievement_id: achievement_id.to_string(),
            unlocked_at: now,
        }))?;
        self.achievements.insert(achievement_id.to_string());
        Ok(true)
    }

    fn record(&mut self, event: JourneyEvent) -> Result<(), JourneyError> {
        self.root.add_domain_event(Some(self.user_id.as_str()), &event)?;
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

fn non_blank<'a>(value: &'a str, field: &str) -> Result<&'a str, JourneyError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(JourneyError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journey::Theme;
    use serde_json::json;

    fn journey() -> UserJourney {
        UserJourney::new("user-1").unwrap()
    }

    fn event_types(journey: &UserJourney) -> Vec<&str> {
        journey
            .uncommitted_events()
            .iter()
            .map(|e| e.event_type())
            .collect()
    }

    fn ready_for_phase_two() -> UserJourney {
        let mut journey = journey();
        journey.complete_lesson("L1").unwrap();
        journey.complete_lesson("L2").unwrap();
        journey.add_achievement("first_asset_selected").unwrap();
        journey.mark_events_as_committed();
        journey
    }

    #[test]
    fn test_new_journey() {
        let journey = journey();
        assert_eq!(journey.current_phase(), Phase::One);
        assert_eq!(journey.confidence_level(), ConfidenceLevel::Curious);
        assert_eq!(journey.version(), 0);
        assert!(journey.has_feature("basic_lessons"));
        assert!(journey.uncommitted_events().is_empty());
        assert_eq!(journey.id().as_str(), "user-1");
    }

    #[test]
    fn test_blank_user_id_fails() {
        assert!(matches!(
            UserJourney::new("   "),
            Err(JourneyError::Validation(_))
        ));
    }

    #[test]
    fn test_advance_without_requirements_fails() {
        let mut journey = journey();
        let result = journey.advance_to_next_phase();

        assert!(matches!(
            result,
            Err(JourneyError::RequirementsNotMet {
                target: Phase::Two,
                lessons_completed: 0,
                lessons_required: 2,
                ..
            })
        ));
        assert_eq!(journey.current_phase(), Phase::One);
        assert_eq!(journey.version(), 0);
        assert!(journey.uncommitted_events().is_empty());
    }

    #[test]
    fn test_advance_with_lessons_but_no_achievement_fails() {
        let mut journey = journey();
        journey.complete_lesson("L1").unwrap();
        journey.complete_lesson("L2").unwrap();
        let version = journey.version();

        assert!(journey.advance_to_next_phase().is_err());
        assert_eq!(journey.version(), version);
    }

    #[test]
    fn test_advance_to_phase_two() {
        let mut journey = ready_for_phase_two();
        let version = journey.version();

        let phase = journey.advance_to_next_phase().unwrap();

        assert_eq!(phase, Phase::Two);
        assert_eq!(journey.current_phase(), Phase::Two);
        assert_eq!(journey.confidence_level(), ConfidenceLevel::Learning);
        assert_eq!(journey.version(), version + 1);
        assert_eq!(event_types(&journey), vec!["PhaseAdvanced"]);
        assert!(journey.has_achievement("phase_2_unlocked"));
        assert!(journey.has_feature("portfolio_builder"));
        assert_eq!(journey.current_mascot(), Mascot::Verde);

        let data = journey.uncommitted_events()[0].event_data();
        assert_eq!(data.get("fromPhase"), Some(&json!(1)));
        assert_eq!(data.get("toPhase"), Some(&json!(2)));
        assert_eq!(data.get("fromMascot"), Some(&json!("aqua")));
        assert_eq!(data.get("toMascot"), Some(&json!("verde")));
    }

    #[test]
    fn test_advance_from_last_phase_fails() {
        let mut journey = journey();
        for i in 0..10 {
            journey.complete_lesson(&format!("L{i}")).unwrap();
        }
        for achievement in [
            "first_asset_selected",
            "diversification_started",
            "advanced_strategies_unlocked",
        ] {
            journey.add_achievement(achievement).unwrap();
        }
        journey.advance_to_next_phase().unwrap();
        journey.advance_to_next_phase().unwrap();
        assert_eq!(journey.advance_to_next_phase().unwrap(), Phase::Four);

        let version = journey.version();
        assert!(matches!(
            journey.advance_to_next_phase(),
            Err(JourneyError::AlreadyAtHighestPhase(Phase::Four))
        ));
        assert_eq!(journey.version(), version);
        assert!(!journey.can_advance_to_next_phase());
    }

    #[test]
    fn test_complete_lesson() {
        let mut journey = journey();
        let unlocked = journey.complete_lesson("L1").unwrap();

        assert_eq!(unlocked, vec!["first_lesson_completed"]);
        assert_eq!(journey.version(), 1);
        assert_eq!(journey.behavior_profile().interaction_count, 1);
        assert_eq!(
            event_types(&journey),
            vec!["LessonCompleted", "AchievementUnlocked"]
        );
    }

    #[test]
    fn test_complete_lesson_twice_fails() {
        let mut journey = journey();
        journey.complete_lesson("L1").unwrap();
        let version = journey.version();

        let result = journey.complete_lesson("L1");
        assert!(matches!(result, Err(JourneyError::LessonAlreadyCompleted(ref id)) if id == "L1"));
        assert!(result.unwrap_err().to_string().contains("already completed"));
        assert_eq!(journey.version(), version);
        assert_eq!(journey.completed_lessons().len(), 1);
    }

    #[test]
    fn test_lesson_milestones_fire_once() {
        let mut journey = journey();
        let mut unlocked = Vec::new();
        for i in 1..=20 {
            unlocked.extend(journey.complete_lesson(&format!("L{i}")).unwrap());
        }

        let expected: Vec<String> = LESSON_MILESTONES
            .iter()
            .map(|(_, a)| a.to_string())
            .collect();
        assert_eq!(unlocked, expected);

        let achievement_events = event_types(&journey)
            .into_iter()
            .filter(|t| *t == "AchievementUnlocked")
            .count();
        assert_eq!(achievement_events, 5);
        assert_eq!(journey.version(), 20);
    }

    #[test]
    fn test_add_achievement_is_idempotent() {
        let mut journey = journey();
        assert!(journey.add_achievement("x").unwrap());
        let size = journey.achievements().len();
        let version = journey.version();

        assert!(!journey.add_achievement("x").unwrap());
        assert_eq!(journey.achievements().len(), size);
        assert_eq!(journey.version(), version);
        assert_eq!(event_types(&journey), vec!["AchievementUnlocked"]);
    }

    #[test]
    fn test_unlock_feature_is_idempotent() {
        let mut journey = journey();
        assert!(journey.unlock_feature("beta_charts").unwrap());
        assert!(!journey.unlock_feature("beta_charts").unwrap());
        assert!(!journey.unlock_feature("basic_lessons").unwrap());
        assert_eq!(event_types(&journey), vec!["FeatureUnlocked"]);
        assert_eq!(journey.version(), 1);
    }

    #[test]
    fn test_update_preferences() {
        let mut journey = journey();
        let changed = journey
            .update_preferences(&json!({ "theme": "dark", "riskTolerance": "wild" }))
            .unwrap();

        assert!(changed);
        assert_eq!(journey.preferences().theme, Theme::Dark);
        assert_eq!(journey.version(), 1);

        let data = journey.uncommitted_events()[0].event_data();
        assert_eq!(data.get("changedFields"), Some(&json!(["theme"])));
    }

    #[test]
    fn test_update_preferences_noop() {
        let mut journey = journey();
        assert!(!journey.update_preferences(&json!({ "theme": "neon" })).unwrap());
        assert_eq!(journey.version(), 0);
        assert!(journey.uncommitted_events().is_empty());

        assert!(matches!(
            journey.update_preferences(&json!("dark")),
            Err(JourneyError::Validation(_))
        ));
    }

    #[test]
    fn test_update_behavior_profile() {
        let mut journey = journey();
        let update = BehaviorUpdate::new().session_duration(120.0).learning_style("visual");
        assert!(journey.update_behavior_profile(&update).unwrap());

        assert_eq!(journey.behavior_profile().average_session_duration, 60.0);
        assert_eq!(event_types(&journey), vec!["BehaviorProfileUpdated"]);

        let bad = BehaviorUpdate::new().session_duration(-5.0);
        assert!(matches!(
            journey.update_behavior_profile(&bad),
            Err(JourneyError::Validation(_))
        ));
        assert_eq!(journey.version(), 1);
    }

    #[test]
    fn test_update_behavior_profile_rejects_interaction_overflow() {
        let mut journey = journey();
        journey.complete_lesson("L1").unwrap();
        let before = journey.behavior_profile().clone();
        let version = journey.version();
        let pending = journey.uncommitted_events().len();

        let result =
            journey.update_behavior_profile(&BehaviorUpdate::new().interactions(u64::MAX));

        assert!(matches!(result, Err(JourneyError::Validation(_))));
        assert_eq!(journey.behavior_profile(), &before);
        assert_eq!(journey.version(), version);
        assert_eq!(journey.uncommitted_events().len(), pending);
    }

    #[test]
    fn test_progress() {
        let mut journey = journey();
        journey.complete_lesson("L1").unwrap();

        let progress = journey.progress();
        assert_eq!(progress.next_phase, Some(Phase::Two));
        assert_eq!(progress.lessons_completed, 1);
        assert_eq!(progress.lessons_required, Some(2));
        assert_eq!(
            progress.missing_achievement.as_deref(),
            Some("first_asset_selected")
        );
        assert!(!progress.can_advance);

        let ready = ready_for_phase_two();
        assert!(ready.progress().can_advance);
        assert_eq!(ready.progress().missing_achievement, None);
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut journey = ready_for_phase_two();
        journey.advance_to_next_phase().unwrap();
        journey
            .update_preferences(&json!({ "language": "es", "notifications": false }))
            .unwrap();
        assert!(!journey.uncommitted_events().is_empty());

        let value = journey.to_json().unwrap();
        let restored = UserJourney::from_json(value).unwrap();

        assert_eq!(restored.current_phase(), journey.current_phase());
        assert_eq!(restored.achievements(), journey.achievements());
        assert_eq!(restored.completed_lessons(), journey.completed_lessons());
        assert_eq!(restored.preferences(), journey.preferences());
        assert_eq!(restored.behavior_profile(), journey.behavior_profile());
        assert_eq!(restored.version(), journey.version());
        assert!(restored.uncommitted_events().is_empty());
        assert_eq!(restored.root().loaded_version(), Some(journey.version()));
    }

    #[test]
    fn test_from_json_rejects_bad_phase() {
        let mut value = journey().to_json().unwrap();
        value["currentPhase"] = json!(7);
        assert!(matches!(
            UserJourney::from_json(value),
            Err(JourneyError::Snapshot(_))
        ));
    }
}
