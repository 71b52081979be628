//! Experiment aggregate implementation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::repository::{Persistable, RepositoryError};

use super::events::{
    ConversionRecordedData, ExperimentStartedData, ExperimentStoppedData, UserAssignedData,
    VariantAddedData,
};
use super::hashing::{hash_to_unit, traffic_key, variant_key};
use super::{Assignment, ExperimentError, ExperimentEvent, ExperimentStatus, TargetingRules, Variant};

fn full_traffic() -> f64 {
    1.0
}

/// Definition of a new experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentConfig {
    pub experiment_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Fraction of qualifying users that enter the experiment.
    #[serde(default = "full_traffic")]
    pub traffic_allocation: f64,
    #[serde(default)]
    pub targeting_rules: TargetingRules,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl ExperimentConfig {
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            name: name.into(),
            description: None,
            variants: Vec::new(),
            traffic_allocation: full_traffic(),
            targeting_rules: TargetingRules::default(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn traffic_allocation(mut self, fraction: f64) -> Self {
        self.traffic_allocation = fraction;
        self
    }

    pub fn targeting(mut self, rules: TargetingRules) -> Self {
        self.targeting_rules = rules;
        self
    }

    /// Restricts the window during which an active experiment assigns users.
    pub fn schedule(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Full check for a new experiment, including the schedule window.
    fn validate(&self) -> Result<(), ExperimentError> {
        self.validate_definition()?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end <= start
        {
            return Err(ExperimentError::Validation(
                "end date must be after start date".to_string(),
            ));
        }
        Ok(())
    }

    /// Identity, fractions and variants. Stopping rewrites the end date, so
    /// restored snapshots skip the schedule check.
    fn validate_definition(&self) -> Result<(), ExperimentError> {
        if self.experiment_id.trim().is_empty() {
            return Err(ExperimentError::Validation("experiment id is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ExperimentError::Validation("experiment name is required".to_string()));
        }
        if !is_fraction(self.traffic_allocation) {
            return Err(ExperimentError::Validation(format!(
                "traffic allocation must be between 0 and 1, got {}",
                self.traffic_allocation
            )));
        }
        if let Some(percentage) = self.targeting_rules.percentage
            && !is_fraction(percentage)
        {
            return Err(ExperimentError::Validation(format!(
                "targeting percentage must be between 0 and 1, got {percentage}"
            )));
        }
        let mut seen = HashSet::new();
        for variant in &self.variants {
            validate_variant(variant)?;
            if !seen.insert(variant.id.as_str()) {
                return Err(ExperimentError::DuplicateVariant(variant.id.clone()));
            }
        }
        Ok(())
    }
}

/// An A/B experiment with deterministic, stateless user bucketing.
///
/// `version` grows by one on each lifecycle change (variant added, started,
/// stopped). Assignments and conversions record events without changing the
/// version.
#[derive(Debug, Clone)]
pub struct Experiment {
    root: AggregateRoot,
    config: ExperimentConfig,
    status: ExperimentStatus,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Durable form of an [`Experiment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentSnapshot {
    #[serde(flatten)]
    pub config: ExperimentConfig,
    pub status: ExperimentStatus,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Aggregate for Experiment {
    fn aggregate_type() -> &'static str {
        "Experiment"
    }

    fn root(&self) -> &AggregateRoot {
        &self.root
    }

    fn root_mut(&mut self) -> &mut AggregateRoot {
        &mut self.root
    }
}

impl Persistable for Experiment {
    fn version(&self) -> u64 {
        self.version
    }

    fn to_json(&self) -> Result<Value, serde_json::Error> {
        Experiment::to_json(self)
    }

    fn from_json(value: Value) -> Result<Self, RepositoryError> {
        Experiment::from_json(value).map_err(|e| match e {
            ExperimentError::Snapshot(e) => RepositoryError::Serialization(e),
            other => RepositoryError::Corrupted(other.to_string()),
        })
    }
}

impl Experiment {
    /// Creates a draft experiment from a validated configuration.
    pub fn create(config: ExperimentConfig) -> Result<Self, ExperimentError> {
        config.validate()?;
        let now = Utc::now();
        Ok(Self {
            root: AggregateRoot::new(config.experiment_id.as_str()),
            config,
            status: ExperimentStatus::Draft,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn to_snapshot(&self) -> ExperimentSnapshot {
        ExperimentSnapshot {
            config: self.config.clone(),
            status: self.status,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn from_snapshot(snapshot: ExperimentSnapshot) -> Result<Self, ExperimentError> {
        snapshot.config.validate_definition()?;
        Ok(Self {
            root: AggregateRoot::restored(
                snapshot.config.experiment_id.as_str(),
                snapshot.version,
            ),
            config: snapshot.config,
            status: snapshot.status,
            version: snapshot.version,
            created_at: snapshot.created_at,
            updated_at: snapshot.updated_at,
        })
    }

    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self.to_snapshot())
    }

    pub fn from_json(value: Value) -> Result<Self, ExperimentError> {
        let snapshot: ExperimentSnapshot = serde_json::from_value(value)?;
        Self::from_snapshot(snapshot)
    }
}

// Query methods
impl Experiment {
    pub fn experiment_id(&self) -> &str {
        &self.config.experiment_id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn description(&self) -> Option<&str> {
        self.config.description.as_deref()
    }

    pub fn status(&self) -> ExperimentStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn variants(&self) -> &[Variant] {
        &self.config.variants
    }

    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.config.variants.iter().find(|v| v.id == variant_id)
    }

    pub fn traffic_allocation(&self) -> f64 {
        self.config.traffic_allocation
    }

    pub fn targeting_rules(&self) -> &TargetingRules {
        &self.config.targeting_rules
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.config.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.config.end_date
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Active status and `now` inside the optional start/end window.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ExperimentStatus::Active
            && self.config.start_date.is_none_or(|start| start <= now)
            && self.config.end_date.is_none_or(|end| now < end)
    }

    /// Whether the user passes targeting and the traffic gate. Ignores status.
    pub fn is_user_eligible(&self, user_id: &str) -> bool {
        if !self.config.targeting_rules.qualifies(user_id) {
            return false;
        }
        self.config.traffic_allocation >= 1.0
            || hash_to_unit(&traffic_key(user_id, self.experiment_id()))
                < self.config.traffic_allocation
    }

    /// Variant the user buckets into, regardless of status and eligibility.
    ///
    /// Two variants with a control split on `hash < 0.5`; otherwise the unit
    /// interval is cut into equal-width buckets, one per variant.
    pub fn variant_for_user(&self, user_id: &str) -> Option<&Variant> {
        let variants = &self.config.variants;
        if variants.is_empty() {
            return None;
        }

        let h = hash_to_unit(&variant_key(user_id, self.experiment_id()));
        if variants.len() == 2
            && let Some(control) = variants.iter().position(|v| v.is_control)
        {
            let index = if h < 0.5 { control } else { 1 - control };
            return variants.get(index);
        }

        let index = ((h * variants.len() as f64).floor() as usize).min(variants.len() - 1);
        variants.get(index)
    }
}

// Command methods
impl Experiment {
    /// Adds a variant while the experiment is still a draft.
    pub fn add_variant(&mut self, variant: Variant) -> Result<(), ExperimentError> {
        if !self.status.can_modify_variants() {
            return Err(ExperimentError::InvalidStateTransition {
                current_status: self.status,
                action: "add variant",
            });
        }
        validate_variant(&variant)?;
        if self.variant(&variant.id).is_some() {
            return Err(ExperimentError::DuplicateVariant(variant.id));
        }

        self.record(
            None,
            ExperimentEvent::VariantAdded(VariantAddedData {
                variant_id: variant.id.clone(),
                is_control: variant.is_control,
                weight: variant.weight,
            }),
        )?;
        self.config.variants.push(variant);
        self.touch(Utc::now());
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), ExperimentError> {
        self.start_at(Utc::now())
    }

    /// Activates a draft with at least two variants. A configured start date
    /// is kept; otherwise `now` becomes the start date.
    pub fn start_at(&mut self, now: DateTime<Utc>) -> Result<(), ExperimentError> {
        if !self.status.can_start() {
            return Err(ExperimentError::InvalidStateTransition {
                current_status: self.status,
                action: "start",
            });
        }
        if self.config.variants.len() < 2 {
            return Err(ExperimentError::NotEnoughVariants {
                count: self.config.variants.len(),
            });
        }

        let started_at = self.config.start_date.unwrap_or(now);
        self.record(
            None,
            ExperimentEvent::ExperimentStarted(ExperimentStartedData {
                name: self.config.name.clone(),
                variant_ids: self.config.variants.iter().map(|v| v.id.clone()).collect(),
                traffic_allocation: self.config.traffic_allocation,
                started_at,
            }),
        )?;
        self.status = ExperimentStatus::Active;
        self.config.start_date = Some(started_at);
        self.touch(now);

        tracing::info!(experiment_id = %self.experiment_id(), "experiment started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ExperimentError> {
        self.stop_at(Utc::now())
    }

    pub fn stop_at(&mut self, now: DateTime<Utc>) -> Result<(), ExperimentError> {
        if !self.status.can_stop() {
            return Err(ExperimentError::InvalidStateTransition {
                current_status: self.status,
                action: "stop",
            });
        }

        self.record(
            None,
            ExperimentEvent::ExperimentStopped(ExperimentStoppedData { stopped_at: now }),
        )?;
        self.status = ExperimentStatus::Completed;
        self.config.end_date = Some(now);
        self.touch(now);

        tracing::info!(experiment_id = %self.experiment_id(), "experiment stopped");
        Ok(())
    }

    pub fn assign_user_to_variant(
        &mut self,
        user_id: &str,
        context: Map<String, Value>,
    ) -> Result<Option<Assignment>, ExperimentError> {
        self.assign_user_to_variant_at(user_id, context, Utc::now())
    }

    /// Buckets a user deterministically.
    ///
    /// Returns `None` without recording anything when the experiment is not
    /// running at `now` or the user fails targeting or the traffic gate.
    /// Repeated calls for the same user always pick the same variant.
    pub fn assign_user_to_variant_at(
        &mut self,
        user_id: &str,
        context: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>, ExperimentError> {
        if user_id.trim().is_empty() {
            return Err(ExperimentError::Validation("user id is required".to_string()));
        }
        if !self.is_active_at(now) || !self.is_user_eligible(user_id) {
            return Ok(None);
        }
        let Some(variant) = self.variant_for_user(user_id) else {
            return Ok(None);
        };

        let assignment = Assignment {
            experiment_id: self.experiment_id().to_string(),
            user_id: user_id.to_string(),
            variant_id: variant.id.clone(),
            is_control: variant.is_control,
            assigned_at: now,
            context,
        };
        self.record(
            Some(user_id),
            ExperimentEvent::UserAssigned(UserAssignedData {
                experiment_id: assignment.experiment_id.clone(),
                variant_id: assignment.variant_id.clone(),
                is_control: assignment.is_control,
                assigned_at: now,
                context: assignment.context.clone(),
            }),
        )?;
        Ok(Some(assignment))
    }

    /// Records a conversion for a user who is part of the running experiment.
    /// Returns the user's variant id.
    pub fn record_conversion(
        &mut self,
        user_id: &str,
        metric: &str,
        value: f64,
    ) -> Result<String, ExperimentError> {
        let now = Utc::now();
        if metric.trim().is_empty() {
            return Err(ExperimentError::Validation("metric is required".to_string()));
        }
        if !value.is_finite() {
            return Err(ExperimentError::Validation(format!(
                "conversion value must be finite, got {value}"
            )));
        }
        if !self.is_active_at(now) {
            return Err(ExperimentError::NotActive(self.status));
        }

        let variant_id = self
            .is_user_eligible(user_id)
            .then(|| self.variant_for_user(user_id))
            .flatten()
            .map(|v| v.id.clone())
            .ok_or_else(|| ExperimentError::UserNotAssigned(user_id.to_string()))?;

        self.record(
            Some(user_id),
            ExperimentEvent::ConversionRecorded(ConversionRecordedData {
                variant_id: variant_id.clone(),
                metric: metric.to_string(),
                value,
                recorded_at: now,
            }),
        )?;
        Ok(variant_id)
    }
}

// Internal helpers
impl Experiment {
    fn record(&mut self, user_id: Option<&str>, event: ExperimentEvent) -> Result<(), ExperimentError> {
        self.root.add_domain_event(user_id, &event)?;
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}

fn is_fraction(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn validate_variant(variant: &Variant) -> Result<(), ExperimentError> {
    if variant.id.trim().is_empty() {
        return Err(ExperimentError::Validation("variant id is required".to_string()));
    }
    if !variant.weight.is_finite() || variant.weight < 0.0 {
        return Err(ExperimentError::Validation(format!(
            "variant weight must be a non-negative number, got {}",
            variant.weight
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn ab_config() -> ExperimentConfig {
        ExperimentConfig::new("onboarding-copy", "Onboarding copy")
            .variant(Variant::control("control"))
            .variant(Variant::new("treatment"))
    }

    fn active(config: ExperimentConfig) -> Experiment {
        let mut experiment = Experiment::create(config).unwrap();
        experiment.start().unwrap();
        experiment.mark_events_as_committed();
        experiment
    }

    #[test]
    fn test_create_validates_config() {
        assert!(matches!(
            Experiment::create(ExperimentConfig::new("", "x")),
            Err(ExperimentError::Validation(_))
        ));
        assert!(matches!(
            Experiment::create(ExperimentConfig::new("e", "  ")),
            Err(ExperimentError::Validation(_))
        ));
        assert!(matches!(
            Experiment::create(ExperimentConfig::new("e", "x").traffic_allocation(1.5)),
            Err(ExperimentError::Validation(_))
        ));
        assert!(matches!(
            Experiment::create(
                ExperimentConfig::new("e", "x").targeting(TargetingRules::percentage(-0.1))
            ),
            Err(ExperimentError::Validation(_))
        ));
        assert!(matches!(
            Experiment::create(
                ExperimentConfig::new("e", "x")
                    .variant(Variant::new("a"))
                    .variant(Variant::new("a"))
            ),
            Err(ExperimentError::DuplicateVariant(id)) if id == "a"
        ));
    }

    #[test]
    fn test_new_experiment_is_draft() {
        let experiment = Experiment::create(ab_config()).unwrap();
        assert_eq!(experiment.status(), ExperimentStatus::Draft);
        assert_eq!(experiment.version(), 0);
        assert!(!experiment.is_active());
        assert_eq!(experiment.id().as_str(), "onboarding-copy");
    }

    #[test]
    fn test_start_requires_two_variants() {
        let mut experiment =
            Experiment::create(ExperimentConfig::new("e", "x").variant(Variant::control("c")))
                .unwrap();

        assert!(matches!(
            experiment.start(),
            Err(ExperimentError::NotEnoughVariants { count: 1 })
        ));
        assert_eq!(experiment.status(), ExperimentStatus::Draft);
        assert!(experiment.uncommitted_events().is_empty());
    }

    #[test]
    fn test_stop_draft_fails() {
        let mut experiment = Experiment::create(ab_config()).unwrap();
        assert!(matches!(
            experiment.stop(),
            Err(ExperimentError::InvalidStateTransition {
                current_status: ExperimentStatus::Draft,
                action: "stop"
            })
        ));
    }

    #[test]
    fn test_lifecycle() {
        let mut experiment = Experiment::create(ab_config()).unwrap();
        experiment.start().unwrap();
        assert!(experiment.is_active());
        assert_eq!(experiment.version(), 1);
        assert!(experiment.start_date().is_some());

        assert!(matches!(
            experiment.start(),
            Err(ExperimentError::InvalidStateTransition { .. })
        ));

        experiment.stop().unwrap();
        assert_eq!(experiment.status(), ExperimentStatus::Completed);
        assert_eq!(experiment.version(), 2);
        assert!(experiment.status().is_terminal());
        assert!(experiment.stop().is_err());

        let types: Vec<_> = experiment
            .uncommitted_events()
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(types, vec!["ExperimentStarted", "ExperimentStopped"]);
    }

    #[test]
    fn test_add_variant_only_in_draft() {
        let mut experiment = Experiment::create(ExperimentConfig::new("e", "x")).unwrap();
        experiment.add_variant(Variant::control("a")).unwrap();
        experiment.add_variant(Variant::new("b")).unwrap();
        assert_eq!(experiment.version(), 2);

        assert!(matches!(
            experiment.add_variant(Variant::new("b")),
            Err(ExperimentError::DuplicateVariant(_))
        ));

        experiment.start().unwrap();
        assert!(matches!(
            experiment.add_variant(Variant::new("c")),
            Err(ExperimentError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_assignment_is_stable() {
        let mut experiment = active(ab_config());
        let first = experiment
            .assign_user_to_variant("user-42", Map::new())
            .unwrap()
            .unwrap();

        for _ in 0..10 {
            let again = experiment
                .assign_user_to_variant("user-42", Map::new())
                .unwrap()
                .unwrap();
            assert_eq!(again.variant_id, first.variant_id);
        }
        assert_eq!(experiment.uncommitted_events().len(), 11);
        assert_eq!(experiment.version(), 1);
    }

    #[test]
    fn test_two_variant_control_split_uses_half() {
        let experiment = active(ab_config());
        for i in 0..200 {
            let user = format!("user-{i}");
            let h = hash_to_unit(&variant_key(&user, "onboarding-copy"));
            let expected = if h < 0.5 { "control" } else { "treatment" };
            assert_eq!(experiment.variant_for_user(&user).unwrap().id, expected);
        }
    }

    #[test]
    fn test_control_position_does_not_matter() {
        let experiment = active(
            ExperimentConfig::new("onboarding-copy", "Onboarding copy")
                .variant(Variant::new("treatment"))
                .variant(Variant::control("control")),
        );
        for i in 0..200 {
            let user = format!("user-{i}");
            let h = hash_to_unit(&variant_key(&user, "onboarding-copy"));
            let expected = if h < 0.5 { "control" } else { "treatment" };
            assert_eq!(experiment.variant_for_user(&user).unwrap().id, expected);
        }
    }

    #[test]
    fn test_equal_width_buckets() {
        let experiment = active(
            ExperimentConfig::new("three-way", "Three way")
                .variant(Variant::new("a"))
                .variant(Variant::new("b"))
                .variant(Variant::new("c")),
        );
        for i in 0..200 {
            let user = format!("user-{i}");
            let h = hash_to_unit(&variant_key(&user, "three-way"));
            let index = (h * 3.0).floor() as usize;
            assert_eq!(
                experiment.variant_for_user(&user).unwrap().id,
                ["a", "b", "c"][index]
            );
        }
    }

    #[test]
    fn test_inactive_experiment_assigns_nobody() {
        let mut experiment = Experiment::create(ab_config()).unwrap();
        assert_eq!(
            experiment.assign_user_to_variant("user-1", Map::new()).unwrap(),
            None
        );
        assert!(experiment.uncommitted_events().is_empty());
    }

    #[test]
    fn test_schedule_window() {
        let now = Utc::now();
        let mut experiment = active(
            ab_config().schedule(Some(now + Duration::hours(1)), Some(now + Duration::hours(2))),
        );

        assert_eq!(
            experiment
                .assign_user_to_variant_at("user-1", Map::new(), now)
                .unwrap(),
            None
        );
        assert!(
            experiment
                .assign_user_to_variant_at("user-1", Map::new(), now + Duration::minutes(90))
                .unwrap()
                .is_some()
        );
        assert_eq!(
            experiment
                .assign_user_to_variant_at("user-1", Map::new(), now + Duration::hours(3))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_targeting_allow_list() {
        let mut experiment = active(ab_config().targeting(TargetingRules::users(["alice"])));
        assert!(
            experiment
                .assign_user_to_variant("alice", Map::new())
                .unwrap()
                .is_some()
        );
        assert!(
            experiment
                .assign_user_to_variant("bob", Map::new())
                .unwrap()
                .is_none()
        );
        assert_eq!(experiment.uncommitted_events().len(), 1);
    }

    #[test]
    fn test_zero_traffic_admits_nobody() {
        let mut experiment = active(ab_config().traffic_allocation(0.0));
        for i in 0..50 {
            let user = format!("user-{i}");
            assert!(
                experiment
                    .assign_user_to_variant(&user, Map::new())
                    .unwrap()
                    .is_none()
            );
        }
    }

    #[test]
    fn test_traffic_gate_matches_hash() {
        let experiment = active(ab_config().traffic_allocation(0.3));
        for i in 0..200 {
            let user = format!("user-{i}");
            let h = hash_to_unit(&traffic_key(&user, "onboarding-copy"));
            assert_eq!(experiment.is_user_eligible(&user), h < 0.3);
        }
    }

    #[test]
    fn test_assignment_event_carries_context() {
        let mut experiment = active(ab_config());
        let mut context = Map::new();
        context.insert("platform".to_string(), json!("ios"));

        let assignment = experiment
            .assign_user_to_variant("user-7", context)
            .unwrap()
            .unwrap();

        let event = &experiment.uncommitted_events()[0];
        assert_eq!(event.event_type(), "UserAssigned");
        assert_eq!(event.user_id(), Some("user-7"));
        assert_eq!(
            event.event_data().get("variantId"),
            Some(&json!(assignment.variant_id))
        );
        assert_eq!(
            event.event_data().get("context"),
            Some(&json!({ "platform": "ios" }))
        );
    }

    #[test]
    fn test_record_conversion() {
        let mut experiment = active(ab_config());
        let expected = experiment.variant_for_user("user-3").unwrap().id.clone();

        let variant = experiment.record_conversion("user-3", "signup", 1.0).unwrap();
        assert_eq!(variant, expected);
        assert_eq!(
            experiment.uncommitted_events()[0].event_type(),
            "ConversionRecorded"
        );

        let mut draft = Experiment::create(ab_config()).unwrap();
        assert!(matches!(
            draft.record_conversion("user-3", "signup", 1.0),
            Err(ExperimentError::NotActive(ExperimentStatus::Draft))
        ));

        let mut targeted = active(ab_config().targeting(TargetingRules::users(["alice"])));
        assert!(matches!(
            targeted.record_conversion("bob", "signup", 1.0),
            Err(ExperimentError::UserNotAssigned(_))
        ));
    }

    #[test]
    fn test_serialization_round_trip() {
        let mut experiment = active(
            ab_config()
                .description("Copy test")
                .traffic_allocation(0.5)
                .targeting(TargetingRules::percentage(0.8)),
        );
        experiment
            .assign_user_to_variant("user-1", Map::new())
            .unwrap();

        let value = experiment.to_json().unwrap();
        assert_eq!(value["status"], json!("active"));
        assert_eq!(value["experimentId"], json!("onboarding-copy"));

        let restored = Experiment::from_json(value).unwrap();
        assert_eq!(restored.to_snapshot(), experiment.to_snapshot());
        assert!(restored.uncommitted_events().is_empty());
        assert_eq!(
            restored.variant_for_user("user-1"),
            experiment.variant_for_user("user-1")
        );
    }

    #[test]
    fn test_stopped_before_scheduled_start_still_restores() {
        let start = Utc::now() + Duration::days(1);
        let mut experiment =
            Experiment::create(ab_config().schedule(Some(start), None)).unwrap();
        experiment.start().unwrap();
        experiment.stop().unwrap();

        let restored = Experiment::from_json(experiment.to_json().unwrap()).unwrap();
        assert_eq!(restored.status(), ExperimentStatus::Completed);
        assert_eq!(restored.version(), 2);
    }
}
