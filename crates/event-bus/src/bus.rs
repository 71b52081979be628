//! Publish/subscribe router for domain events.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use common::EventId;
use futures_util::future::join_all;
use serde::{Serialize, Serializer};

use crate::config::EventBusConfig;
use crate::error::{EventBusError, Result};
use crate::event::DomainEvent;
use crate::handler::{EventHandler, SubscribeOptions, SubscriptionId, WILDCARD};
use crate::history::{EventHistory, HistoryFilter};
use crate::middleware::Middleware;
use crate::security::SecurityContext;
use crate::stats::{BusStats, HandlerStats, StatsRecorder};

/// How handlers for one event are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Run handlers one after another in priority order instead of
    /// concurrently.
    pub sequential: bool,
}

impl PublishOptions {
    pub fn sequential() -> Self {
        Self { sequential: true }
    }
}

/// Overall outcome of a publish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    /// Handlers were dispatched; individual failures are in the outcomes.
    Completed,

    /// Nobody was subscribed to the event type.
    NoHandlers,

    /// Security or middleware stopped the publish and error recovery
    /// captured the failure.
    Failed,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Completed => "completed",
            PublishStatus::NoHandlers => "no_handlers",
            PublishStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn as_millis<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// Result of a single handler invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerOutcome {
    pub subscription_id: SubscriptionId,
    pub handler: String,
    pub success: bool,
    pub error: Option<String>,
    #[serde(rename = "durationMs", serialize_with = "as_millis")]
    pub duration: Duration,
}

/// Summary returned by [`EventBus::publish`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub event_id: EventId,
    pub event_type: String,
    pub status: PublishStatus,
    pub handler_count: usize,
    pub successful_handlers: usize,
    pub failed_handlers: usize,
    #[serde(rename = "processingTimeMs", serialize_with = "as_millis")]
    pub processing_time: Duration,
    pub error: Option<String>,
    pub outcomes: Vec<HandlerOutcome>,
}

impl PublishResult {
    fn empty(event_id: EventId, event_type: String, status: PublishStatus) -> Self {
        Self {
            event_id,
            event_type,
            status,
            handler_count: 0,
            successful_handlers: 0,
            failed_handlers: 0,
            processing_time: Duration::ZERO,
            error: None,
            outcomes: Vec::new(),
        }
    }

    /// Result for an event the bus refused before dispatch.
    pub fn rejected(event: &DomainEvent, error: &EventBusError) -> Self {
        let mut result = Self::empty(
            event.event_id(),
            event.event_type().to_string(),
            PublishStatus::Failed,
        );
        result.error = Some(error.to_string());
        result
    }

    /// Returns true if every dispatched handler succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.status != PublishStatus::Failed && self.failed_handlers == 0
    }
}

#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    priority: i32,
    once: bool,
    sequence: u64,
    handler: Arc<dyn EventHandler>,
}

#[derive(Default)]
struct Registry {
    by_type: HashMap<String, Vec<Registration>>,
    next_sequence: u64,
}

impl Registry {
    fn insert(
        &mut self,
        event_type: String,
        options: SubscribeOptions,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        let id = SubscriptionId::new();
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.by_type.entry(event_type).or_default().push(Registration {
            id,
            priority: options.priority,
            once: options.once,
            sequence,
            handler,
        });
        id
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        self.by_type.retain(|_, registrations| {
            let before = registrations.len();
            registrations.retain(|r| r.id != id);
            removed |= registrations.len() != before;
            !registrations.is_empty()
        });
        removed
    }

    /// Returns the handlers for `event_type` in dispatch order and drops any
    /// `once` registrations among them.
    fn take_dispatch_list(&mut self, event_type: &str) -> Vec<Registration> {
        let mut keys = vec![event_type];
        if event_type != WILDCARD {
            keys.push(WILDCARD);
        }

        let mut matched = Vec::new();
        for key in keys {
            if let Some(registrations) = self.by_type.get_mut(key) {
                matched.extend(registrations.iter().cloned());
                registrations.retain(|r| !r.once);
                if registrations.is_empty() {
                    self.by_type.remove(key);
                }
            }
        }

        matched.sort_by_key(|r| (Reverse(r.priority), r.sequence));
        matched
    }
}

struct Inner {
    config: EventBusConfig,
    registry: RwLock<Registry>,
    middleware: RwLock<Vec<Arc<dyn Middleware>>>,
    security: RwLock<Option<Arc<dyn SecurityContext>>>,
    history: Mutex<EventHistory>,
    stats: Mutex<StatsRecorder>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process event router.
///
/// The bus is an owned value: construct it, inject clones into the services
/// that publish, and call [`EventBus::dispose`] when done. Clones share the
/// same registry, history and statistics. Locks are never held across an
/// `.await`.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.inner.config)
            .field("event_types", &self.event_types())
            .finish()
    }
}

impl EventBus {
    /// Creates a bus with the given configuration.
    pub fn new(config: EventBusConfig) -> Self {
        let history = EventHistory::new(config.history_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                registry: RwLock::new(Registry::default()),
                middleware: RwLock::new(Vec::new()),
                security: RwLock::new(None),
                history: Mutex::new(history),
                stats: Mutex::new(StatsRecorder::default()),
            }),
        }
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.inner.config
    }

    /// Installs the security context consulted on subscribe and publish.
    pub fn set_security_context(&self, security: Arc<dyn SecurityContext>) {
        *write(&self.inner.security) = Some(security);
    }

    /// Appends a middleware to the publish pipeline.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>) {
        write(&self.inner.middleware).push(middleware);
    }

    /// Registers `handler` for `event_type` (or [`WILDCARD`] for all types).
    ///
    /// Every call yields a fresh subscription, even for the same handler.
    #[tracing::instrument(skip(self, event_type, handler), fields(event_type))]
    pub async fn subscribe(
        &self,
        event_type: impl Into<String>,
        handler: Arc<dyn EventHandler>,
        options: SubscribeOptions,
    ) -> Result<SubscriptionId> {
        let event_type = event_type.into();
        tracing::Span::current().record("event_type", event_type.as_str());

        if event_type.trim().is_empty() {
            return Err(EventBusError::validation("event type must be a non-empty string"));
        }

        self.authorize(None, "subscribe", &event_type).await?;

        let id = write(&self.inner.registry).insert(event_type.clone(), options, handler);
        tracing::debug!(
            subscription_id = %id,
            priority = options.priority,
            once = options.once,
            "handler subscribed"
        );
        Ok(id)
    }

    /// Removes a subscription. Returns true iff one was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = write(&self.inner.registry).remove(id);
        if removed {
            tracing::debug!(subscription_id = %id, "handler unsubscribed");
        }
        removed
    }

    /// Publishes an event, running handlers concurrently.
    pub async fn publish(&self, event: DomainEvent) -> Result<PublishResult> {
        self.publish_with(event, PublishOptions::default()).await
    }

    /// Publishes an event with explicit scheduling options.
    ///
    /// Returns `Err` for malformed events, and for security or middleware
    /// failures unless error recovery is enabled. Handler failures and
    /// timeouts are only ever reported in the result.
    #[tracing::instrument(
        skip(self, event, options),
        fields(event_type = %event.event_type(), event_id = %event.event_id())
    )]
    pub async fn publish_with(
        &self,
        event: DomainEvent,
        options: PublishOptions,
    ) -> Result<PublishResult> {
        let started = Instant::now();
        event.validate()?;

        let event_id = event.event_id();
        let event_type = event.event_type().to_string();

        let event = match self.prepare(event).await {
            Ok(event) => event,
            Err(err) => {
                lock(&self.inner.stats).record_rejection();
                metrics::counter!("event_bus_publish_rejected_total").increment(1);
                if !self.inner.config.error_recovery {
                    return Err(err);
                }
                tracing::warn!(error = %err, "publish failed, captured by error recovery");
                let mut result = PublishResult::empty(event_id, event_type, PublishStatus::Failed);
                result.error = Some(err.to_string());
                result.processing_time = started.elapsed();
                return Ok(result);
            }
        };

        lock(&self.inner.history).record(event.clone());
        metrics::counter!("event_bus_events_published_total").increment(1);

        let registrations = write(&self.inner.registry).take_dispatch_list(event.event_type());

        if registrations.is_empty() {
            tracing::debug!("no handlers registered");
            let elapsed = started.elapsed();
            lock(&self.inner.stats).record_publish(elapsed);
            let mut result = PublishResult::empty(event_id, event_type, PublishStatus::NoHandlers);
            result.processing_time = elapsed;
            return Ok(result);
        }

        let outcomes = if options.sequential {
            let mut outcomes = Vec::with_capacity(registrations.len());
            for registration in &registrations {
                outcomes.push(self.invoke(registration, &event).await);
            }
            outcomes
        } else {
            join_all(registrations.iter().map(|r| self.invoke(r, &event))).await
        };

        let successful = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - successful;
        let elapsed = started.elapsed();

        lock(&self.inner.stats).record_publish(elapsed);
        metrics::histogram!("event_bus_publish_duration_seconds").record(elapsed.as_secs_f64());

        if failed > 0 {
            tracing::warn!(handlers = outcomes.len(), failed, "some handlers failed");
        } else {
            tracing::debug!(handlers = outcomes.len(), "event dispatched");
        }

        Ok(PublishResult {
            event_id,
            event_type,
            status: PublishStatus::Completed,
            handler_count: outcomes.len(),
            successful_handlers: successful,
            failed_handlers: failed,
            processing_time: elapsed,
            error: None,
            outcomes,
        })
    }

    /// Publishes events in order, stopping at the first bus-level error.
    pub async fn publish_all(&self, events: Vec<DomainEvent>) -> Result<Vec<PublishResult>> {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            results.push(self.publish(event).await?);
        }
        Ok(results)
    }

    /// Returns recorded events matching `filter`, oldest first.
    pub fn history(&self, filter: &HistoryFilter) -> Vec<DomainEvent> {
        lock(&self.inner.history).query(filter)
    }

    pub fn clear_history(&self) {
        lock(&self.inner.history).clear();
    }

    pub fn stats(&self) -> BusStats {
        lock(&self.inner.stats).bus()
    }

    pub fn handler_stats(&self, id: SubscriptionId) -> Option<HandlerStats> {
        lock(&self.inner.stats).handler(id)
    }

    /// Number of live subscriptions for exactly `event_type`.
    pub fn subscription_count(&self, event_type: &str) -> usize {
        read(&self.inner.registry)
            .by_type
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Event types with at least one live subscription, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<_> = read(&self.inner.registry).by_type.keys().cloned().collect();
        types.sort();
        types
    }

    /// Drops every subscription, middleware, recorded event and counter.
    pub fn dispose(&self) {
        *write(&self.inner.registry) = Registry::default();
        write(&self.inner.middleware).clear();
        lock(&self.inner.history).clear();
        lock(&self.inner.stats).reset();
        tracing::debug!("event bus disposed");
    }

    async fn authorize(&self, user_id: Option<&str>, action: &str, resource: &str) -> Result<()> {
        let security = read(&self.inner.security).clone();
        let Some(security) = security else {
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

    /// Runs the shape and security checks `publish` would apply to `event`,
    /// without dispatching or recording it.
    pub async fn authorize_publish(&self, event: &DomainEvent) -> Result<()> {
        event.validate()?;
        self.authorize(event.user_id(), "publish", event.event_type())
            .await
    }

    async fn prepare(&self, event: DomainEvent) -> Result<DomainEvent> {
        self.authorize(event.user_id(), "publish", event.event_type())
            .await?;

        let chain = read(&self.inner.middleware).clone();
        let mut event = event;
        for middleware in chain {
            event = middleware
                .process(event)
                .await
                .map_err(|e| EventBusError::Middleware {
                    middleware: middleware.name().to_string(),
                    reason: e.to_string(),
                })?;
            event.validate()?;
        }
        Ok(event)
    }

    async fn invoke(&self, registration: &Registration, event: &DomainEvent) -> HandlerOutcome {
        let started = Instant::now();
        let limit = self.inner.config.max_handler_execution_time;
        let handler = Arc::clone(&registration.handler);
        let handler_name = handler.name().to_string();
        let task_event = event.clone();

        // Running on its own task isolates panics; on timeout the task is
        // detached rather than cancelled unless abort_on_timeout is set.
        let task = tokio::spawn(async move { handler.handle(&task_event).await });
        let abort = task.abort_handle();

        let result = match tokio::time::timeout(limit, task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(err))) => Err(err.to_string()),
            Ok(Err(join_err)) if join_err.is_panic() => Err("handler panicked".to_string()),
            Ok(Err(_)) => Err("handler task was cancelled".to_string()),
            Err(_) => {
                if self.inner.config.abort_on_timeout {
                    abort.abort();
                }
                Err(format!("handler timed out after {}ms", limit.as_millis()))
            }
        };

        let duration = started.elapsed();
        let success = result.is_ok();
        lock(&self.inner.stats).record_handler(registration.id, duration, success);

        if let Err(ref error) = result {
            metrics::counter!("event_bus_handler_errors_total").increment(1);
            tracing::warn!(
                subscription_id = %registration.id,
                handler = handler_name.as_str(),
                error = error.as_str(),
                "handler failed"
            );
        }

        HandlerOutcome {
            subscription_id: registration.id,
            handler: handler_name,
            success,
            error: result.err(),
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerError, handler_fn};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(event_type: &str) -> DomainEvent {
        DomainEvent::builder()
            .event_type(event_type)
            .aggregate_id("agg-1")
            .build()
            .unwrap()
    }

    fn counting_handler(counter: Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
        handler_fn(move |_event| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_publish_without_handlers() {
        let bus = EventBus::default();
        let result = bus.publish(event("Nothing")).await.unwrap();

        assert_eq!(result.status, PublishStatus::NoHandlers);
        assert_eq!(result.handler_count, 0);
        assert!(result.error.is_none());
        assert_eq!(bus.stats().events_published, 1);
    }

    #[tokio::test]
    async fn test_subscribe_rejects_blank_event_type() {
        let bus = EventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let result = bus
            .subscribe(" ", counting_handler(counter), SubscribeOptions::default())
            .await;
        assert!(matches!(result, Err(EventBusError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_returns_false() {
        let bus = EventBus::default();
        assert!(!bus.unsubscribe(SubscriptionId::new()));
    }

    #[tokio::test]
    async fn test_once_handler_fires_once() {
        let bus = EventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            "Tick",
            counting_handler(Arc::clone(&counter)),
            SubscribeOptions::new().once(),
        )
        .await
        .unwrap();

        bus.publish(event("Tick")).await.unwrap();
        let second = bus.publish(event("Tick")).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(second.status, PublishStatus::NoHandlers);
        assert_eq!(bus.subscription_count("Tick"), 0);
    }

    #[tokio::test]
    async fn test_once_handler_removed_after_failure() {
        let bus = EventBus::default();
        bus.subscribe(
            "Tick",
            handler_fn(|_| async { Err(HandlerError::new("boom")) }),
            SubscribeOptions::new().once(),
        )
        .await
        .unwrap();

        let result = bus.publish(event("Tick")).await.unwrap();
        assert_eq!(result.failed_handlers, 1);
        assert_eq!(bus.subscription_count("Tick"), 0);
    }

    #[tokio::test]
    async fn test_wildcard_receives_every_type() {
        let bus = EventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            WILDCARD,
            counting_handler(Arc::clone(&counter)),
            SubscribeOptions::default(),
        )
        .await
        .unwrap();

        bus.publish(event("A")).await.unwrap();
        bus.publish(event("B")).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_publish_all_keeps_order() {
        let bus = EventBus::default();
        let results = bus
            .publish_all(vec![event("A"), event("B")])
            .await
            .unwrap();

        let types: Vec<_> = results.iter().map(|r| r.event_type.as_str()).collect();
        assert_eq!(types, vec!["A", "B"]);
        assert_eq!(bus.stats().events_published, 2);
    }

    #[tokio::test]
    async fn test_history_records_published_events() {
        let bus = EventBus::new(EventBusConfig::default().with_history_capacity(2));
        bus.publish(event("A")).await.unwrap();
        bus.publish(event("B")).await.unwrap();
        bus.publish(event("C")).await.unwrap();

        let history = bus.history(&HistoryFilter::new());
        let types: Vec<_> = history.iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(types, vec!["B", "C"]);

        bus.clear_history();
        assert!(bus.history(&HistoryFilter::new()).is_empty());
    }

    #[tokio::test]
    async fn test_dispose_clears_state() {
        let bus = EventBus::default();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.subscribe("A", counting_handler(counter), SubscribeOptions::default())
            .await
            .unwrap();
        bus.publish(event("A")).await.unwrap();

        bus.dispose();

        assert!(bus.event_types().is_empty());
        assert!(bus.history(&HistoryFilter::new()).is_empty());
        assert_eq!(bus.stats(), BusStats::default());
    }

    #[test]
    fn test_publish_status_serializes_snake_case() {
        let json = serde_json::to_string(&PublishStatus::NoHandlers).unwrap();
        assert_eq!(json, "\"no_handlers\"");
        assert_eq!(PublishStatus::Completed.to_string(), "completed");
    }
}
