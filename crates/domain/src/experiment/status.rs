use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of an experiment: `Draft -> Active -> Completed`, one way only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    /// Being configured; variants may still be added.
    #[default]
    Draft,

    /// Assigning users.
    Active,

    /// Stopped. Terminal.
    Completed,
}

impl ExperimentStatus {
    pub fn can_modify_variants(&self) -> bool {
        matches!(self, ExperimentStatus::Draft)
    }

    pub fn can_start(&self) -> bool {
        matches!(self, ExperimentStatus::Draft)
    }

    pub fn can_stop(&self) -> bool {
        matches!(self, ExperimentStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExperimentStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperimentStatus::Draft => "draft",
            ExperimentStatus::Active => "active",
            ExperimentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
