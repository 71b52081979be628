use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{AggregateId, EventId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{EventBusError, Result};

/// Schema version stamped on every event produced by this crate.
pub const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Event payload, frozen at construction.
///
/// The map sits behind an `Arc` and is only ever handed out by shared
/// reference, so cloning an event never copies its data and no holder can
/// mutate it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventData(Arc<Map<String, Value>>);

impl EventData {
    /// Freezes a JSON object as event data.
    pub fn new(map: Map<String, Value>) -> Self {
        Self(Arc::new(map))
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for EventData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EventData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::new)
    }
}

/// An immutable record of something that happened to an aggregate.
///
/// Serializes to the camelCase wire shape
/// `{eventId, eventType, aggregateId, userId, eventData, timestamp, version}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainEvent {
    event_id: EventId,
    event_type: String,
    aggregate_id: AggregateId,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    event_data: EventData,
    timestamp: DateTime<Utc>,
    #[serde(default = "schema_version")]
    version: u32,
}

impl DomainEvent {
    /// Creates a new event builder.
    pub fn builder() -> DomainEventBuilder {
        DomainEventBuilder::default()
    }

    /// Parses an event from its wire shape and validates it.
    pub fn from_json(value: Value) -> Result<Self> {
        let event: Self = serde_json::from_value(value)
            .map_err(|e| EventBusError::validation(format!("malformed event: {e}")))?;
        event.validate()?;
        Ok(event)
    }

    /// Checks the fields every publishable event must carry.
    pub fn validate(&self) -> Result<()> {
        if self.event_type.trim().is_empty() {
            return Err(EventBusError::validation("event type is required"));
        }
        if self.event_id.is_nil() {
            return Err(EventBusError::validation("event id is required"));
        }
        Ok(())
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn event_data(&self) -> &EventData {
        &self.event_data
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Deserializes the payload into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.event_data.as_map().clone()))
    }
}

/// Builder for constructing domain events.
#[derive(Debug, Default)]
pub struct DomainEventBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_id: Option<AggregateId>,
    user_id: Option<String>,
    event_data: Map<String, Value>,
    timestamp: Option<DateTime<Utc>>,
}

impl DomainEventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
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

    pub fn maybe_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Sets the timestamp. If not set, the current time will be used.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Replaces the payload with a raw JSON object.
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.event_data = data;
        self
    }

    /// Adds a single payload field.
    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event_data.insert(key.into(), value);
        self
    }

    /// Sets the payload from a serializable value, which must serialize to
    /// a JSON object.
    pub fn payload<T: Serialize>(mut self, payload: &T) -> Result<Self> {
        match serde_json::to_value(payload)? {
            Value::Object(map) => {
                self.event_data = map;
                Ok(self)
            }
            Value::Null => {
                self.event_data = Map::new();
                Ok(self)
            }
            other => Err(EventBusError::validation(format!(
                "event payload must be a JSON object, got {other}"
            ))),
        }
    }

    /// Builds and validates the event.
    pub fn build(self) -> Result<DomainEvent> {
        let event_type = self
            .event_type
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EventBusError::validation("event type is required"))?;
        let aggregate_id = self
            .aggregate_id
            .filter(|id| !id.is_blank())
            .ok_or_else(|| EventBusError::validation("aggregate id is required"))?;

        let event = DomainEvent {
            event_id: self.event_id.unwrap_or_default(),
            event_type,
            aggregate_id,
            user_id: self.user_id,
            event_data: EventData::new(self.event_data),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            version: SCHEMA_VERSION,
        };
        event.validate()?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event() -> DomainEvent {
        DomainEvent::builder()
            .event_type("LessonCompleted")
            .aggregate_id("user-1")
            .user_id("user-1")
            .field("lessonId", json!("L1"))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_stamps_defaults() {
        let event = sample_event();
        assert_eq!(event.event_type(), "LessonCompleted");
        assert_eq!(event.aggregate_id().as_str(), "user-1");
        assert_eq!(event.user_id(), Some("user-1"));
        assert_eq!(event.version(), SCHEMA_VERSION);
        assert!(!event.event_id().is_nil());
        assert_eq!(event.event_data().get("lessonId"), Some(&json!("L1")));
    }

    #[test]
    fn builder_requires_event_type_and_aggregate() {
        let missing_type = DomainEvent::builder().aggregate_id("a").build();
        assert!(matches!(missing_type, Err(EventBusError::Validation(_))));

        let blank_type = DomainEvent::builder()
            .event_type("  ")
            .aggregate_id("a")
            .build();
        assert!(matches!(blank_type, Err(EventBusError::Validation(_))));

        let missing_aggregate = DomainEvent::builder().event_type("X").build();
        assert!(matches!(missing_aggregate, Err(EventBusError::Validation(_))));
    }

    #[test]
    fn payload_must_be_an_object() {
        let result = DomainEvent::builder()
            .event_type("X")
            .aggregate_id("a")
            .payload(&vec![1, 2, 3]);
        assert!(matches!(result, Err(EventBusError::Validation(_))));
    }

    #[test]
    fn clones_share_the_frozen_payload() {
        let event = sample_event();
        let copy = event.clone();
        assert!(std::ptr::eq(
            event.event_data().as_map(),
            copy.event_data().as_map()
        ));
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let event = sample_event();
        let value = serde_json::to_value(&event).unwrap();

        assert!(value.get("eventId").is_some());
        assert_eq!(value["eventType"], json!("LessonCompleted"));
        assert_eq!(value["aggregateId"], json!("user-1"));
        assert_eq!(value["userId"], json!("user-1"));
        assert_eq!(value["eventData"]["lessonId"], json!("L1"));
        assert_eq!(value["version"], json!(1));
        assert!(value["timestamp"].is_string());

        let parsed = DomainEvent::from_json(value).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn from_json_rejects_missing_event_type() {
        let value = json!({
            "eventId": uuid::Uuid::new_v4(),
            "aggregateId": "a",
            "timestamp": "2024-01-01T00:00:00Z"
        });
        assert!(matches!(
            DomainEvent::from_json(value),
            Err(EventBusError::Validation(_))
        ));
    }

    #[test]
    fn from_json_rejects_nil_event_id() {
        let value = json!({
            "eventId": uuid::Uuid::nil(),
            "eventType": "X",
            "aggregateId": "a",
            "timestamp": "2024-01-01T00:00:00Z"
        });
        assert!(matches!(
            DomainEvent::from_json(value),
            Err(EventBusError::Validation(_))
        ));
    }

    #[test]
    fn data_as_deserializes_payload() {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Lesson {
            lesson_id: String,
        }

        let lesson: Lesson = sample_event().data_as().unwrap();
        assert_eq!(lesson.lesson_id, "L1");
    }
}
