//! Experiment service providing a simplified API for experiment operations.

use std::sync::Arc;

use event_bus::{EventBus, SecurityContext};
use serde_json::{Map, Value};

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::monitor::PerformanceMonitor;
use crate::repository::{Repository, RepositoryFilter};

use super::{Assignment, Experiment, ExperimentConfig, ExperimentStatus, Variant};

/// Service for managing experiments.
///
/// Lifecycle operations are authorized without a user (the security context
/// decides what an anonymous caller may do); assignment and conversions are
/// authorized for the user being bucketed.
pub struct ExperimentService<R: Repository<Experiment>> {
    handler: CommandHandler<R, Experiment>,
}

impl<R: Repository<Experiment>> ExperimentService<R> {
    /// Creates a new experiment service.
    pub fn new(repository: R, bus: EventBus) -> Self {
        Self {
            handler: CommandHandler::new(repository, bus),
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
    pub fn handler(&self) -> &CommandHandler<R, Experiment> {
        &self.handler
    }

    /// Stores a new draft experiment.
    #[tracing::instrument(skip(self, config), fields(experiment_id = %config.experiment_id))]
    pub async fn create_experiment(
        &self,
        config: ExperimentConfig,
    ) -> Result<Experiment, DomainError> {
        self.handler
            .authorize(None, "create_experiment", &config.experiment_id)
            .await?;
        let experiment = Experiment::create(config)?;
        let result = self.handler.create("create_experiment", experiment).await?;
        Ok(result.aggregate)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_experiment(
        &self,
        experiment_id: &str,
    ) -> Result<Option<Experiment>, DomainError> {
        self.handler
            .authorize(None, "read_experiment", experiment_id)
            .await?;
        self.handler.load_existing(experiment_id).await
    }

    /// Experiments that are active and inside their schedule window.
    #[tracing::instrument(skip(self))]
    pub async fn active_experiments(&self) -> Result<Vec<Experiment>, DomainError> {
        self.handler.authorize(None, "read_experiment", "*").await?;
        let filter = RepositoryFilter::new().field("status", ExperimentStatus::Active.as_str());
        let experiments = self.handler.repository().find_all(&filter).await?;
        Ok(experiments.into_iter().filter(Experiment::is_active).collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_variant(
        &self,
        experiment_id: &str,
        variant: Variant,
    ) -> Result<CommandResult<Experiment>, DomainError> {
        self.handler
            .execute("add_variant", experiment_id, None, |experiment| {
                experiment.add_variant(variant)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn start_experiment(
        &self,
        experiment_id: &str,
    ) -> Result<CommandResult<Experiment>, DomainError> {
        self.handler
            .execute("start_experiment", experiment_id, None, |experiment| {
                experiment.start()
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn stop_experiment(
        &self,
        experiment_id: &str,
    ) -> Result<CommandResult<Experiment>, DomainError> {
        self.handler
            .execute("stop_experiment", experiment_id, None, |experiment| {
                experiment.stop()
            })
            .await
    }

    /// Buckets a user. The output is `None` when the user does not take part.
    #[tracing::instrument(skip(self, context))]
    pub async fn assign_user(
        &self,
        experiment_id: &str,
        user_id: &str,
        context: Map<String, Value>,
    ) -> Result<CommandResult<Experiment, Option<Assignment>>, DomainError> {
        self.handler
            .execute("assign_user", experiment_id, Some(user_id), |experiment| {
                experiment.assign_user_to_variant(user_id, context)
            })
            .await
    }

    /// Records a conversion; the output is the user's variant id.
    #[tracing::instrument(skip(self))]
    pub async fn record_conversion(
        &self,
        experiment_id: &str,
        user_id: &str,
        metric: &str,
        value: f64,
    ) -> Result<CommandResult<Experiment, String>, DomainError> {
        self.handler
            .execute("record_conversion", experiment_id, Some(user_id), |experiment| {
                experiment.record_conversion(user_id, metric, value)
            })
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_experiment(&self, experiment_id: &str) -> Result<(), DomainError> {
        self.handler
            .authorize(None, "delete_experiment", experiment_id)
            .await?;
        self.handler.repository().delete(experiment_id).await?;
        Ok(())
    }
}
