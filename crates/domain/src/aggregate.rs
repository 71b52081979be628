//! Aggregate root base and the event payload trait.

use common::AggregateId;
use event_bus::{DomainEvent, EventBusError};
use serde::Serialize;

/// Typed payload of a domain event.
///
/// Implementors serialize to the JSON object stored as the event's data;
/// the event type tag comes from [`EventPayload::event_type`].
pub trait EventPayload: Serialize {
    fn event_type(&self) -> &'static str;
}

/// State shared by every aggregate: identity, the version it was loaded at,
/// and the events recorded since the last commit.
///
/// Events can only be appended from inside this crate, by the aggregate's own
/// mutating methods.
#[derive(Debug, Clone)]
pub struct AggregateRoot {
    id: AggregateId,
    loaded_version: Option<u64>,
    uncommitted: Vec<DomainEvent>,
}

impl AggregateRoot {
    /// Root for a freshly created aggregate.
    pub fn new(id: impl Into<AggregateId>) -> Self {
        Self {
            id: id.into(),
            loaded_version: None,
            uncommitted: Vec::new(),
        }
    }

    /// Root for an aggregate restored from a snapshot at `version`.
    pub fn restored(id: impl Into<AggregateId>, version: u64) -> Self {
        Self {
            id: id.into(),
            loaded_version: Some(version),
            uncommitted: Vec::new(),
        }
    }

    pub fn id(&self) -> &AggregateId {
        &self.id
    }

    /// Version the aggregate had when it was restored, `None` if new.
    pub fn loaded_version(&self) -> Option<u64> {
        self.loaded_version
    }

    pub fn uncommitted_events(&self) -> &[DomainEvent] {
        &self.uncommitted
    }

    pub fn has_uncommitted_events(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// Marks the recorded events as published. Call once per transaction,
    /// after handing [`uncommitted_events`](Self::uncommitted_events) to the bus.
    pub fn mark_events_as_committed(&mut self) {
        self.uncommitted.clear();
    }

    /// Drains the recorded events, committing them in one step.
    pub fn take_uncommitted_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.uncommitted)
    }

    /// Discards recorded events without publishing them.
    pub fn clear_domain_events(&mut self) {
        if !self.uncommitted.is_empty() {
            tracing::debug!(
                aggregate_id = %self.id,
                discarded = self.uncommitted.len(),
                "discarding uncommitted events"
            );
        }
        self.uncommitted.clear();
    }

    pub(crate) fn add_domain_event<E: EventPayload>(
        &mut self,
        user_id: Option<&str>,
        payload: &E,
    ) -> Result<(), EventBusError> {
        let event = DomainEvent::builder()
            .event_type(payload.event_type())
            .aggregate_id(self.id.clone())
            .maybe_user_id(user_id.map(str::to_string))
            .payload(payload)?
            .build()?;
        self.uncommitted.push(event);
        Ok(())
    }
}

/// Common behaviour of aggregates built on [`AggregateRoot`].
pub trait Aggregate {
    /// Aggregate type name, used for logging and storage keys.
    fn aggregate_type() -> &'static str;

    fn root(&self) -> &AggregateRoot;

    fn root_mut(&mut self) -> &mut AggregateRoot;

    fn id(&self) -> &AggregateId {
        self.root().id()
    }

    fn uncommitted_events(&self) -> &[DomainEvent] {
        self.root().uncommitted_events()
    }

    fn mark_events_as_committed(&mut self) {
        self.root_mut().mark_events_as_committed();
    }

    fn take_uncommitted_events(&mut self) -> Vec<DomainEvent> {
        self.root_mut().take_uncommitted_events()
    }

    fn clear_domain_events(&mut self) {
        self.root_mut().clear_domain_events();
    }
}
