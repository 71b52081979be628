//! Experiment domain events.

use chrono::{DateTime, Utc};
use event_bus::DomainEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::EventPayload;

/// Events recorded by an [`Experiment`](super::Experiment).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExperimentEvent {
    /// A variant was added while drafting.
    VariantAdded(VariantAddedData),

    /// The experiment began assigning users.
    ExperimentStarted(ExperimentStartedData),

    /// The experiment was stopped.
    ExperimentStopped(ExperimentStoppedData),

    /// A user was bucketed into a variant.
    UserAssigned(UserAssignedData),

    /// An assigned user converted on a metric.
    ConversionRecorded(ConversionRecordedData),
}

impl ExperimentEvent {
    pub const VARIANT_ADDED: &'static str = "VariantAdded";
    pub const EXPERIMENT_STARTED: &'static str = "ExperimentStarted";
    pub const EXPERIMENT_STOPPED: &'static str = "ExperimentStopped";
    pub const USER_ASSIGNED: &'static str = "UserAssigned";
    pub const CONVERSION_RECORDED: &'static str = "ConversionRecorded";

    /// Decodes a published record back into a typed experiment event.
    ///
    /// Returns `None` when the record is not an experiment event.
    pub fn from_domain_event(event: &DomainEvent) -> Option<Result<Self, serde_json::Error>> {
        let decoded = match event.event_type() {
            Self::VARIANT_ADDED => event.data_as().map(ExperimentEvent::VariantAdded),
            Self::EXPERIMENT_STARTED => event.data_as().map(ExperimentEvent::ExperimentStarted),
            Self::EXPERIMENT_STOPPED => event.data_as().map(ExperimentEvent::ExperimentStopped),
            Self::USER_ASSIGNED => event.data_as().map(ExperimentEvent::UserAssigned),
            Self::CONVERSION_RECORDED => event.data_as().map(ExperimentEvent::ConversionRecorded),
            _ => return None,
        };
        Some(decoded)
    }
}

impl EventPayload for ExperimentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ExperimentEvent::VariantAdded(_) => Self::VARIANT_ADDED,
            ExperimentEvent::ExperimentStarted(_) => Self::EXPERIMENT_STARTED,
            ExperimentEvent::ExperimentStopped(_) => Self::EXPERIMENT_STOPPED,
            ExperimentEvent::UserAssigned(_) => Self::USER_ASSIGNED,
            ExperimentEvent::ConversionRecorded(_) => Self::CONVERSION_RECORDED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantAddedData {
    pub variant_id: String,
    pub is_control: bool,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStartedData {
    pub name: String,
    pub variant_ids: Vec<String>,
    pub traffic_allocation: f64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStoppedData {
    pub stopped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignedData {
    pub experiment_id: String,
    pub variant_id: String,
    pub is_control: bool,
    pub assigned_at: DateTime<Utc>,
    #[serde(default)]
    pub context: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecordedData {
    pub variant_id: String,
    pub metric: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}
