//! End-to-end run of the scripted demo session.

use app::{Config, DemoSummary};

async fn run_as(user_id: &str) -> DemoSummary {
    let config = Config {
        demo_user_id: user_id.to_string(),
        ..Config::default()
    };
    app::run(&config).await.unwrap()
}

#[tokio::test]
async fn test_demo_advances_learner_to_phase_two() {
    let summary = run_as("learner-1").await;

    assert_eq!(summary.user_id, "learner-1");
    assert_eq!(summary.phase, 2);
    assert_eq!(summary.mascot, "verde");
    assert!(summary.achievements.contains(&"first_lesson_completed".to_string()));
    assert!(summary.achievements.contains(&"phase_2_unlocked".to_string()));
    assert!(summary.unlocked_features.contains(&"portfolio_builder".to_string()));
}

#[tokio::test]
async fn test_demo_buckets_learner_into_a_variant() {
    let summary = run_as("learner-2").await;

    let variant = summary.variant_id.expect("full traffic assigns everyone");
    assert!(variant == "control" || variant == "guided");
    assert_eq!(summary.experiment_id, "onboarding-tips");
}

#[tokio::test]
async fn test_demo_publishes_without_handler_errors() {
    let summary = run_as("learner-3").await;

    assert!(summary.events_published > 0);
    assert!(summary.events_handled >= summary.events_published);
    assert_eq!(summary.error_count, 0);
}

#[tokio::test]
async fn test_summary_serializes_camel_case() {
    let summary = run_as("learner-4").await;
    let value = serde_json::to_value(&summary).unwrap();

    assert_eq!(value["userId"], "learner-4");
    assert!(value.get("eventsPublished").is_some());
    assert!(value.get("variantId").is_some());
}
