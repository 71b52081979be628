//! Scripted learner session run by the binary.

use std::sync::Arc;

use domain::experiment::ExperimentEvent;
use domain::journey::JourneyEvent;
use domain::{
    BehaviorUpdate, Experiment, ExperimentConfig, ExperimentService, InMemoryStorage,
    JourneyService, StorageRepository, UserJourney, Variant,
};
use event_bus::{
    EventBus, HandlerError, LoggingMiddleware, SubscribeOptions, WILDCARD, handler_fn,
};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::config::Config;
use crate::error::AppError;

/// Experiment the demo learner is bucketed into.
pub const DEMO_EXPERIMENT_ID: &str = "onboarding-tips";

const DEMO_LESSONS: [&str; 2] = ["intro-to-investing", "what-is-an-asset"];

/// What the session left behind, logged as JSON at the end of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoSummary {
    pub user_id: String,
    pub phase: u8,
    pub mascot: String,
    pub achievements: Vec<String>,
    pub unlocked_features: Vec<String>,
    pub journey_version: u64,
    pub experiment_id: String,
    pub variant_id: Option<String>,
    pub events_published: u64,
    pub events_handled: u64,
    pub error_count: u64,
}

/// Creates the bus with logging middleware and the demo's subscribers.
pub async fn build_bus(config: &Config) -> Result<EventBus, AppError> {
    let bus = EventBus::new(config.bus.clone());
    bus.use_middleware(Arc::new(LoggingMiddleware));

    bus.subscribe(
        WILDCARD,
        handler_fn(|event| async move {
            tracing::info!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                user_id = event.user_id().unwrap_or("-"),
                "event published"
            );
            Ok(())
        }),
        SubscribeOptions::new(),
    )
    .await?;

    bus.subscribe(
        JourneyEvent::PHASE_ADVANCED,
        handler_fn(|event| async move {
            match JourneyEvent::from_domain_event(&event) {
                Some(Ok(JourneyEvent::PhaseAdvanced(data))) => {
                    let mascot = data.to_mascot.personality();
                    tracing::info!(
                        mascot = mascot.display_name(),
                        phase = %data.to_phase,
                        message = %mascot.phase_message(data.to_phase),
                        "mascot greeting"
                    );
                    Ok(())
                }
                Some(Err(e)) => Err(HandlerError::new(format!("undecodable phase event: {e}"))),
                _ => Ok(()),
            }
        }),
        SubscribeOptions::new().priority(10),
    )
    .await?;

    bus.subscribe(
        ExperimentEvent::USER_ASSIGNED,
        handler_fn(|event| async move {
            if let Some(Ok(ExperimentEvent::UserAssigned(data))) =
                ExperimentEvent::from_domain_event(&event)
            {
                tracing::info!(
                    experiment_id = %data.experiment_id,
                    variant_id = %data.variant_id,
                    is_control = data.is_control,
                    "user bucketed"
                );
            }
            Ok(())
        }),
        SubscribeOptions::new(),
    )
    .await?;

    Ok(bus)
}

/// Drives the configured learner through lessons, a phase advance and an
/// onboarding experiment.
#[tracing::instrument(skip(config), fields(user_id = %config.demo_user_id))]
pub async fn run(config: &Config) -> Result<DemoSummary, AppError> {
    let user_id = config.demo_user_id.as_str();

    // 1. Wire the bus and both services over one storage
    let bus = build_bus(config).await?;
    let storage = InMemoryStorage::new();
    let journeys = JourneyService::new(
        StorageRepository::<UserJourney, _>::for_aggregate(storage.clone()),
        bus.clone(),
    );
    let experiments = ExperimentService::new(
        StorageRepository::<Experiment, _>::for_aggregate(storage),
        bus.clone(),
    );

    // 2. Learn enough to leave phase 1
    journeys.start_journey(user_id).await?;
    for lesson in DEMO_LESSONS {
        let result = journeys.complete_lesson(user_id, lesson).await?;
        if !result.output.is_empty() {
            tracing::info!(lesson, unlocked = ?result.output, "milestones reached");
        }
    }
    journeys.add_achievement(user_id, "first_asset_selected").await?;
    let progress = journeys.progress(user_id).await?;
    tracing::info!(
        next_phase = ?progress.next_phase,
        can_advance = progress.can_advance,
        "progress checked"
    );
    journeys.advance_phase(user_id).await?;

    // 3. Personalize
    journeys
        .update_preferences(user_id, &json!({ "theme": "dark", "riskTolerance": "aggressive" }))
        .await?;
    journeys
        .record_behavior(
            user_id,
            &BehaviorUpdate::new()
                .interactions(3)
                .session_duration(420.0)
                .learning_style("visual"),
        )
        .await?;

    // 4. Run the onboarding experiment
    let onboarding = ExperimentConfig::new(DEMO_EXPERIMENT_ID, "Onboarding tips")
        .description("Guided tips on the portfolio builder")
        .variant(Variant::control("control"))
        .variant(Variant::new("guided").with_change("showTips", json!(true)));
    experiments.create_experiment(onboarding).await?;
    experiments.start_experiment(DEMO_EXPERIMENT_ID).await?;

    let mut context = Map::new();
    context.insert("platform".to_string(), Value::from("cli"));
    let assignment = experiments
        .assign_user(DEMO_EXPERIMENT_ID, user_id, context)
        .await?
        .output;
    if assignment.is_some() {
        experiments
            .record_conversion(DEMO_EXPERIMENT_ID, user_id, "lesson_started", 1.0)
            .await?;
    }

    // 5. Collect the results
    let journey = journeys.start_journey(user_id).await?;
    let stats = bus.stats();
    bus.dispose();

    Ok(DemoSummary {
        user_id: user_id.to_string(),
        phase: journey.current_phase().number(),
        mascot: journey.current_mascot().to_string(),
        achievements: journey.achievements().iter().cloned().collect(),
        unlocked_features: journey.unlocked_features().iter().cloned().collect(),
        journey_version: journey.version(),
        experiment_id: DEMO_EXPERIMENT_ID.to_string(),
        variant_id: assignment.map(|a| a.variant_id),
        events_published: stats.events_published,
        events_handled: stats.events_handled,
        error_count: stats.error_count,
    })
}
