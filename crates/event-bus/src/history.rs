//! Bounded history of published events.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use common::AggregateId;

use crate::event::DomainEvent;

/// Filter for [`EventHistory::query`].
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Filter by event type.
    pub event_type: Option<String>,

    /// Filter by aggregate ID.
    pub aggregate_id: Option<AggregateId>,

    /// Filter by user ID.
    pub user_id: Option<String>,

    /// Only events at or after this timestamp.
    pub since: Option<DateTime<Utc>>,

    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn aggregate_id(mut self, id: impl Into<AggregateId>) -> Self {
        self.aggregate_id = Some(id.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, event: &DomainEvent) -> bool {
        if let Some(ref event_type) = self.event_type
            && event.event_type() != event_type
        {
            return false;
        }
        if let Some(ref id) = self.aggregate_id
            && event.aggregate_id() != id
        {
            return false;
        }
        if let Some(ref user_id) = self.user_id
            && event.user_id() != Some(user_id.as_str())
        {
            return false;
        }
        if let Some(since) = self.since
            && event.timestamp() < since
        {
            return false;
        }
        true
    }
}

/// Ring buffer of the most recently published events.
///
/// Once `capacity` is reached the oldest event is evicted. A capacity of zero
/// disables recording.
#[derive(Debug)]
pub struct EventHistory {
    events: VecDeque<DomainEvent>,
    capacity: usize,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn record(&mut self, event: DomainEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Returns matching events, oldest first.
    pub fn query(&self, filter: &HistoryFilter) -> Vec<DomainEvent> {
        let matching: Vec<_> = self
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();

        match filter.limit {
            Some(limit) if matching.len() > limit => matching[matching.len() - limit..].to_vec(),
            _ => matching,
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
