//! Experiment value objects.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::hashing::hash_to_unit;

fn default_weight() -> f64 {
    1.0
}

/// One arm of an experiment.
///
/// `weight` is kept for reporting only; bucketing splits users evenly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub is_control: bool,
    /// Configuration overrides applied for users in this arm.
    #[serde(default)]
    pub changes: Map<String, Value>,
}

impl Variant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight: default_weight(),
            is_control: false,
            changes: Map::new(),
        }
    }

    pub fn control(id: impl Into<String>) -> Self {
        Self {
            is_control: true,
            ..Self::new(id)
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_change(mut self, key: impl Into<String>, value: Value) -> Self {
        self.changes.insert(key.into(), value);
        self
    }
}

/// Who may enter an experiment.
///
/// An explicit `user_ids` list wins over `percentage`; with neither set every
/// user qualifies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetingRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<BTreeSet<String>>,
    /// Fraction of users, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

impl TargetingRules {
    pub fn everyone() -> Self {
        Self::default()
    }

    pub fn users<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_ids: Some(ids.into_iter().map(Into::into).collect()),
            percentage: None,
        }
    }

    pub fn percentage(fraction: f64) -> Self {
        Self {
            user_ids: None,
            percentage: Some(fraction),
        }
    }

    pub fn qualifies(&self, user_id: &str) -> bool {
        if let Some(ids) = &self.user_ids {
            return ids.contains(user_id);
        }
        match self.percentage {
            Some(fraction) => hash_to_unit(user_id) < fraction,
            None => true,
        }
    }
}

/// A user's place in an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub experiment_id: String,
    pub user_id: String,
    pub variant_id: String,
    pub is_control: bool,
    pub assigned_at: DateTime<Utc>,
    /// Caller-supplied context echoed back, such as platform or locale.
    #[serde(default)]
    pub context: Map<String, Value>,
}
