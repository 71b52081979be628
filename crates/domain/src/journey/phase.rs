//! Journey phases, their entry gates and unlocked features.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mascot::Mascot;

/// Returned when a number outside 1..=4 is used as a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid journey phase: {0} (expected 1-4)")]
pub struct InvalidPhase(pub u8);

/// Learning phase. Advances one step at a time; `Four` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    #[default]
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::One, Phase::Two, Phase::Three, Phase::Four];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::One => Some(Phase::Two),
            Phase::Two => Some(Phase::Three),
            Phase::Three => Some(Phase::Four),
            Phase::Four => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn confidence(self) -> ConfidenceLevel {
        match self {
            Phase::One => ConfidenceLevel::Curious,
            Phase::Two => ConfidenceLevel::Learning,
            Phase::Three => ConfidenceLevel::Confident,
            Phase::Four => ConfidenceLevel::Expert,
        }
    }

    pub fn mascot(self) -> Mascot {
        Mascot::for_phase(self)
    }

    /// Gate a journey must pass to enter this phase. `None` for the first.
    pub fn entry_requirements(self) -> Option<PhaseRequirements> {
        match self {
            Phase::One => None,
            Phase::Two => Some(PhaseRequirements {
                min_lessons: 2,
                achievement: "first_asset_selected",
            }),
            Phase::Three => Some(PhaseRequirements {
                min_lessons: 5,
                achievement: "diversification_started",
            }),
            Phase::Four => Some(PhaseRequirements {
                min_lessons: 10,
                achievement: "advanced_strategies_unlocked",
            }),
        }
    }

    /// Features available once this phase is reached.
    pub fn features(self) -> &'static [&'static str] {
        match self {
            Phase::One => &["basic_lessons", "asset_explorer"],
            Phase::Two => &["portfolio_builder", "risk_quiz"],
            Phase::Three => &["diversification_tools", "market_simulator"],
            Phase::Four => &["advanced_strategies", "strategy_backtester"],
        }
    }

    /// Achievement granted on entering this phase.
    pub fn unlock_achievement(self) -> String {
        format!("phase_{}_unlocked", self.number())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl TryFrom<u8> for Phase {
    type Error = InvalidPhase;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Phase::One),
            2 => Ok(Phase::Two),
            3 => Ok(Phase::Three),
            4 => Ok(Phase::Four),
            other => Err(InvalidPhase(other)),
        }
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.number()
    }
}

/// Confidence level, tied 1:1 to the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Curious,
    Learning,
    Confident,
    Expert,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Curious => "curious",
            ConfidenceLevel::Learning => "learning",
            ConfidenceLevel::Confident => "confident",
            ConfidenceLevel::Expert => "expert",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRequirements {
    pub min_lessons: usize,
    pub achievement: &'static str,
}

impl PhaseRequirements {
    pub fn is_met(&self, lessons_completed: usize, achievements: &BTreeSet<String>) -> bool {
        lessons_completed >= self.min_lessons && achievements.contains(self.achievement)
    }
}
