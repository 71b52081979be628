//! Journey service providing a simplified API for journey operations.

use std::sync::Arc;

use event_bus::{EventBus, SecurityContext};
use serde_json::Value;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::monitor::PerformanceMonitor;
use crate::repository::Repository;

use super::{BehaviorUpdate, JourneyProgress, Phase, UserJourney};

/// Service for managing user journeys.
///
/// Journeys are keyed by user id and created on first use. Every operation
/// is checked against the security context with the user as actor and the
/// journey as resource.
pub struct JourneyService<R: Repository<UserJourney>> {
    handler: CommandHandler<R, UserJourney>,
}

impl<R: Repository<UserJourney>> JourneyService<R> {
    /// Creates a new journey service.
    pub fn new(repository: R, bus: EventBus) -> Self {
        Self {
            handler: CommandHandler::new(repository, bus)
                .with_factory(|user_id| Ok(UserJourney::new(user_id)?)),
        }
    }

    pub fn with_security(mut self, security: Arc<dyn SecurityContext>) -> Self {
        self.handler = self.handler.with_security(security);
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn PerformanceMonitor>) -> Self {
        self.handler = self.handler.with_monitor(monitor);
        self
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<R, UserJourney> {
        &self.handler
    }

    /// Returns the user's journey, storing a new one if none exists yet.
    #[tracing::instrument(skip(self))]
    pub async fn start_journey(&self, user_id: &str) -> Result<UserJourney, DomainError> {
        self.handler
            .authorize(Some(user_id), "start_journey", user_id)
            .await?;
        if let Some(journey) = self.handler.load_existing(user_id).await? {
            return Ok(journey);
        }

        let journey = UserJourney::new(user_id)?;
        let result = self
            .handler
            .create("start_journey", journey)
            .await?;
        tracing::info!(user_id, "journey started");
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_journey(&self, user_id: &str) -> Result<Option<UserJourney>, DomainError> {
        self.handler
            .authorize(Some(user_id), "read_journey", user_id)
            .await?;
        self.handler.load_existing(user_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn progress(&self, user_id: &str) -> Result<JourneyProgress, DomainError> {
        self.handler
            .authorize(Some(user_id), "read_journey", user_id)
            .await?;
        Ok(self.handler.load(user_id).await?.progress())
    }

    /// Completes a lesson; the output lists achievements it unlocked.
    #[tracing::instrument(skip(self))]
    pub async fn complete_lesson(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<CommandResult<UserJourney, Vec<String>>, DomainError> {
        self.handler
            .execute("complete_lesson", user_id, Some(user_id), |journey| {
                journey.complete_lesson(lesson_id)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_achievement(
        &self,
        user_id: &str,
        achievement_id: &str,
    ) -> Result<CommandResult<UserJourney, bool>, DomainError> {
        self.handler
            .execute("add_achievement", user_id, Some(user_id), |journey| {
                journey.add_achievement(achievement_id)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unlock_feature(
        &self,
        user_id: &str,
        feature_id: &str,
    ) -> Result<CommandResult<UserJourney, bool>, DomainError> {
        self.handler
            .execute("unlock_feature", user_id, Some(user_id), |journey| {
                journey.unlock_feature(feature_id)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn advance_phase(
        &self,
        user_id: &str,
    ) -> Result<CommandResult<UserJourney, Phase>, DomainError> {
        self.handler
            .execute("advance_phase", user_id, Some(user_id), |journey| {
                journey.advance_to_next_phase()
            })
            .await
    }

    #[tracing::instrument(skip(self, patch))]
    pub async fn update_preferences(
        &self,
        user_id: &str,
        patch: &Value,
    ) -> Result<CommandResult<UserJourney, bool>, DomainError> {
        self.handler
            .execute("update_preferences", user_id, Some(user_id), |journey| {
                journey.update_preferences(patch)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn record_behavior(
        &self,
        user_id: &str,
        update: &BehaviorUpdate,
    ) -> Result<CommandResult<UserJourney, bool>, DomainError> {
        self.handler
            .execute("record_behavior", user_id, Some(user_id), |journey| {
                journey.update_behavior_profile(update)
            })
            .await
    }

    /// Deletes the stored journey.
    #[tracing::instrument(skip(self))]
    pub async fn reset_journey(&self, user_id: &str) -> Result<(), DomainError> {
        self.handler
            .authorize(Some(user_id), "reset_journey", user_id)
            .await?;
        self.handler.repository().delete(user_id).await?;
        tracing::info!(user_id, "journey reset");
        Ok(())
    }
}
