use serde::{Deserialize, Serialize};

/// Observed learning behaviour of a user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorProfile {
    pub interaction_count: u64,
    /// Smoothed session length in seconds.
    pub average_session_duration: f64,
    pub learning_style: Option<String>,
}

/// Observation folded into a [`BehaviorProfile`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BehaviorUpdate {
    pub interactions: u64,
    pub session_duration: Option<f64>,
    pub learning_style: Option<String>,
}

impl BehaviorUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interactions(mut self, count: u64) -> Self {
        self.interactions = count;
        self
    }

    pub fn session_duration(mut self, seconds: f64) -> Self {
        self.session_duration = Some(seconds);
        self
    }

    pub fn learning_style(mut self, style: impl Into<String>) -> Self {
        self.learning_style = Some(style.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(duration) = self.session_duration
            && (!duration.is_finite() || duration < 0.0)
        {
            return Err(format!("session duration must be a non-negative number, got {duration}"));
        }
        if let Some(style) = &self.learning_style
            && style.trim().is_empty()
        {
            return Err("learning style must not be blank".to_string());
        }
        Ok(())
    }
}

impl BehaviorProfile {
    pub(crate) fn record_interaction(&mut self) {
        self.interaction_count = self.interaction_count.saturating_add(1);
    }

    /// Folds `update` into the profile and reports whether anything changed.
    ///
    /// Session duration is smoothed as `(old + new) / 2`, which weights the
    /// latest session at one half rather than averaging over all sessions.
    /// Fails without touching the profile if the interaction count would
    /// overflow.
    pub(crate) fn apply(&mut self, update: &BehaviorUpdate) -> Result<bool, String> {
        let interaction_count = self
            .interaction_count
            .checked_add(update.interactions)
            .ok_or_else(|| {
                format!(
                    "interaction count overflow: {} + {}",
                    self.interaction_count, update.interactions
                )
            })?;

        let mut changed = false;

        if update.interactions > 0 {
            self.interaction_count = interaction_count;
            changed = true;
        }

        if let Some(duration) = update.session_duration {
            let smoothed = (self.average_session_duration + duration) / 2.0;
            if smoothed != self.average_session_duration {
                self.average_session_duration = smoothed;
                changed = true;
            }
        }

        if let Some(style) = &update.learning_style
            && self.learning_style.as_deref() != Some(style.as_str())
        {
            self.learning_style = Some(style.clone());
            changed = true;
        }

        Ok(changed)
    }
}
