use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "auto" => Some(Theme::Auto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "conservative" => Some(RiskTolerance::Conservative),
            "moderate" => Some(RiskTolerance::Moderate),
            "aggressive" => Some(RiskTolerance::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User-facing settings of a journey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub language: String,
    pub theme: Theme,
    pub risk_tolerance: RiskTolerance,
    pub notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            theme: Theme::default(),
            risk_tolerance: RiskTolerance::default(),
            notifications: true,
        }
    }
}

impl Preferences {
    /// Merges the valid fields of `patch` into these preferences.
    ///
    /// Each field is checked on its own; unknown keys and values of the wrong
    /// shape are ignored. Returns the names of the fields whose value changed.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(Value::String(language)) = patch.get("language")
            && *language != self.language
        {
            self.language = language.clone();
            changed.push("language");
        }

        if let Some(theme) = patch.get("theme").and_then(Value::as_str).and_then(Theme::parse)
            && theme != self.theme
        {
            self.theme = theme;
            changed.push("theme");
        }

        let risk = patch
            .get("riskTolerance")
            .or_else(|| patch.get("risk_tolerance"))
            .and_then(Value::as_str)
            .and_then(RiskTolerance::parse);
        if let Some(risk) = risk
            && risk != self.risk_tolerance
        {
            self.risk_tolerance = risk;
            changed.push("riskTolerance");
        }

        if let Some(notifications) = patch.get("notifications").and_then(Value::as_bool)
            && notifications != self.notifications
        {
            self.notifications = notifications;
            changed.push("notifications");
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn valid_fields_are_merged() {
        let mut prefs = Preferences::default();
        let changed = prefs.apply_patch(&patch(json!({
            "language": "pt-BR",
            "theme": "dark",
            "riskTolerance": "aggressive",
            "notifications": false
        })));

        assert_eq!(changed, vec!["language", "theme", "riskTolerance", "notifications"]);
        assert_eq!(prefs.language, "pt-BR");
        assert_eq!(prefs.theme, Theme::Dark);
        assert_eq!(prefs.risk_tolerance, RiskTolerance::Aggressive);
        assert!(!prefs.notifications);
    }

    #[test]
    fn invalid_fields_are_dropped() {
        let mut prefs = Preferences::default();
        let changed = prefs.apply_patch(&patch(json!({
            "language": 42,
            "theme": "neon",
            "riskTolerance": "yolo",
            "notifications": "yes",
            "unknown": true
        })));

        assert!(changed.is_empty());
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn mixed_patch_keeps_only_valid_fields() {
        let mut prefs = Preferences::default();
        let changed = prefs.apply_patch(&patch(json!({ "theme": "auto", "riskTolerance": "high" })));

        assert_eq!(changed, vec!["theme"]);
        assert_eq!(prefs.theme, Theme::Auto);
        assert_eq!(prefs.risk_tolerance, RiskTolerance::Moderate);
    }

    #[test]
    fn unchanged_values_are_not_reported() {
        let mut prefs = Preferences::default();
        let changed = prefs.apply_patch(&patch(json!({ "language": "en", "theme": "light" })));
        assert!(changed.is_empty());
    }

    #[test]
    fn snake_case_risk_key_is_accepted() {
        let mut prefs = Preferences::default();
        let changed = prefs.apply_patch(&patch(json!({ "risk_tolerance": "conservative" })));
        assert_eq!(changed, vec!["riskTolerance"]);
    }
}
