//! Command handling infrastructure.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use event_bus::{DomainEvent, EventBus, PublishResult, SecurityContext};

use crate::error::DomainError;
use crate::monitor::{MetricsMonitor, PerformanceMonitor};
use crate::repository::{Persistable, Repository, RepositoryError};

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A, T = ()> {
    /// The aggregate after the command, with its events committed.
    pub aggregate: A,

    /// Value returned by the command itself.
    pub output: T,

    /// The events that were recorded, persisted and published.
    pub events: Vec<DomainEvent>,

    /// One publish result per event, in order. An event the bus refused after
    /// the aggregate was saved shows up here with `PublishStatus::Failed`.
    pub publish_results: Vec<PublishResult>,
}

type Factory<A> = Arc<dyn Fn(&str) -> Result<A, DomainError> + Send + Sync>;

/// Runs commands against aggregates stored in a repository.
///
/// The handler is responsible for:
/// 1. Checking the action against the security context
/// 2. Loading the aggregate (or creating it through the factory)
/// 3. Executing the command, which records events on the aggregate
/// 4. Checking that the bus will accept every recorded event
/// 5. Saving the aggregate and publishing its events
/// 6. Marking the events as committed
///
/// Every run is timed through the [`PerformanceMonitor`].
pub struct CommandHandler<R, A> {
    repository: R,
    bus: EventBus,
    security: Option<Arc<dyn SecurityContext>>,
    monitor: Arc<dyn PerformanceMonitor>,
    factory: Option<Factory<A>>,
    _phantom: PhantomData<fn() -> A>,
}

impl<R, A> CommandHandler<R, A>
where
    R: Repository<A>,
    A: Persistable,
{
    pub fn new(repository: R, bus: EventBus) -> Self {
        Self {
            repository,
            bus,
            security: None,
            monitor: Arc::new(MetricsMonitor),
            factory: None,
            _phantom: PhantomData,
        }
    }

    pub fn with_security(mut self, security: Arc<dyn SecurityContext>) -> Self {
        self.security = Some(security);
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn PerformanceMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Creates missing aggregates on load instead of failing.
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Result<A, DomainError> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Checks an action against the security context, if one is set.
    pub async fn authorize(
        &self,
        user_id: Option<&str>,
        action: &str,
        resource: &str,
    ) -> Result<(), DomainError> {
        let Some(security) = &self.security else {
            return Ok(());
        };

        if let Err(err) = security.validate_user_action(user_id, action, resource).await {
            tracing::warn!(
                target: "audit",
                user_id = user_id.unwrap_or("anonymous"),
                action,
                resource,
                error = %err,
                "security check denied"
            );
            return Err(err.into());
        }
        Ok(())
    }

    /// Loads an aggregate, creating it through the factory if it is missing.
    pub async fn load(&self, id: &str) -> Result<A, DomainError> {
        require_id(id)?;
        match self.repository.find_by_id(id).await {
            Ok(aggregate) => Ok(aggregate),
            Err(RepositoryError::NotFound(_)) => match &self.factory {
                Some(factory) => factory(id),
                None => Err(DomainError::AggregateNotFound {
                    aggregate_type: A::aggregate_type(),
                    aggregate_id: id.to_string(),
                }),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Loads an aggregate, returning `None` if it is not stored.
    pub async fn load_existing(&self, id: &str) -> Result<Option<A>, DomainError> {
        require_id(id)?;
        match self.repository.find_by_id(id).await {
            Ok(aggregate) => Ok(Some(aggregate)),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Executes a command against the aggregate stored under `id`.
    ///
    /// Commands that record no events leave the repository and the bus
    /// untouched.
    pub async fn execute<F, T, E>(
        &self,
        action: &'static str,
        id: &str,
        user_id: Option<&str>,
        command_fn: F,
    ) -> Result<CommandResult<A, T>, DomainError>
    where
        F: FnOnce(&mut A) -> Result<T, E>,
        DomainError: From<E>,
    {
        self.timed(action, id, async {
            require_id(id)?;
            self.authorize(user_id, action, id).await?;
            let mut aggregate = self.load(id).await?;
            let output = command_fn(&mut aggregate)?;
            self.commit(aggregate, output).await
        })
        .await
    }

    /// Stores a freshly built aggregate and publishes anything it recorded.
    ///
    /// The caller is expected to have authorized the action. Fails with
    /// [`RepositoryError::AlreadyExists`] if the id is taken.
    pub async fn create(
        &self,
        action: &'static str,
        aggregate: A,
    ) -> Result<CommandResult<A>, DomainError> {
        let id = aggregate.id().to_string();
        self.timed(action, &id, async {
            self.preflight(&aggregate).await?;
            self.repository.save(&aggregate).await?;
            Ok(self.publish(aggregate, ()).await)
        })
        .await
    }

    async fn commit<T>(&self, aggregate: A, output: T) -> Result<CommandResult<A, T>, DomainError> {
        if aggregate.uncommitted_events().is_empty() {
            return Ok(CommandResult {
                aggregate,
                output,
                events: Vec::new(),
                publish_results: Vec::new(),
            });
        }

        self.preflight(&aggregate).await?;
        self.repository.save(&aggregate).await?;
        Ok(self.publish(aggregate, output).await)
    }

    /// Rejects the command before anything is stored if the bus would refuse
    /// one of its events. Skipped under error recovery, where the bus reports
    /// refusals in the publish result instead.
    async fn preflight(&self, aggregate: &A) -> Result<(), DomainError> {
        if self.bus.config().error_recovery {
            return Ok(());
        }
        for event in aggregate.uncommitted_events() {
            self.bus.authorize_publish(event).await?;
        }
        Ok(())
    }

    /// Publishes every recorded event. The aggregate is already stored, so a
    /// bus failure is reported per event and never aborts the rest.
    async fn publish<T>(&self, mut aggregate: A, output: T) -> CommandResult<A, T> {
        let events = aggregate.uncommitted_events().to_vec();
        let mut publish_results = Vec::with_capacity(events.len());
        for event in &events {
            match self.bus.publish(event.clone()).await {
                Ok(result) => publish_results.push(result),
                Err(err) => {
                    tracing::error!(
                        aggregate_type = A::aggregate_type(),
                        aggregate_id = %aggregate.id(),
                        event_type = event.event_type(),
                        error = %err,
                        "event stored but not published"
                    );
                    publish_results.push(PublishResult::rejected(event, &err));
                }
            }
        }
        aggregate.mark_events_as_committed();

        CommandResult {
            aggregate,
            output,
            events,
            publish_results,
        }
    }

    async fn timed<T>(
        &self,
        action: &'static str,
        id: &str,
        operation: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        let started = Instant::now();
        let result = operation.await;
        self.monitor
            .record(action, started.elapsed(), result.is_ok());

        if let Err(err) = &result {
            if err.is_business_rule() {
                tracing::warn!(
                    action,
                    aggregate_type = A::aggregate_type(),
                    aggregate_id = id,
                    error = %err,
                    "command rejected"
                );
            } else if !matches!(err, DomainError::Security(_)) {
                tracing::error!(
                    action,
                    aggregate_type = A::aggregate_type(),
                    aggregate_id = id,
                    error = %err,
                    "command failed"
                );
            }
        }
        result
    }
}

fn require_id(id: &str) -> Result<(), DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::Validation("aggregate id is required".to_string()));
    }
    Ok(())
}
