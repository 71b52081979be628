//! Event bus configuration.

use std::time::Duration;

/// Tunables for an [`EventBus`](crate::EventBus).
///
/// Reads from environment variables in [`EventBusConfig::from_env`]:
/// - `EVENT_BUS_MAX_HANDLER_MS`: per-handler timeout (default: `5000`)
/// - `EVENT_BUS_HISTORY_CAPACITY`: ring buffer size (default: `1000`)
/// - `EVENT_BUS_ERROR_RECOVERY`: capture security/middleware failures in the
///   publish result instead of returning them (default: `false`)
/// - `EVENT_BUS_ABORT_ON_TIMEOUT`: abort a timed-out handler task instead of
///   leaving it detached (default: `false`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBusConfig {
    pub max_handler_execution_time: Duration,
    pub history_capacity: usize,
    pub error_recovery: bool,
    pub abort_on_timeout: bool,
}

impl EventBusConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_handler_execution_time: env_parse::<u64>("EVENT_BUS_MAX_HANDLER_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_handler_execution_time),
            history_capacity: env_parse("EVENT_BUS_HISTORY_CAPACITY")
                .unwrap_or(defaults.history_capacity),
            error_recovery: env_flag("EVENT_BUS_ERROR_RECOVERY")
                .unwrap_or(defaults.error_recovery),
            abort_on_timeout: env_flag("EVENT_BUS_ABORT_ON_TIMEOUT")
                .unwrap_or(defaults.abort_on_timeout),
        }
    }

    pub fn with_max_handler_execution_time(mut self, limit: Duration) -> Self {
        self.max_handler_execution_time = limit;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_error_recovery(mut self, enabled: bool) -> Self {
        self.error_recovery = enabled;
        self
    }

    pub fn with_abort_on_timeout(mut self, enabled: bool) -> Self {
        self.abort_on_timeout = enabled;
        self
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_handler_execution_time: Duration::from_millis(5000),
            history_capacity: 1000,
            error_recovery: false,
            abort_on_timeout: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    parse_flag(&std::env::var(key).ok()?)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = EventBusConfig::default();
        assert_eq!(config.max_handler_execution_time, Duration::from_secs(5));
        assert_eq!(config.history_capacity, 1000);
        assert!(!config.error_recovery);
        assert!(!config.abort_on_timeout);
    }

    #[test]
    fn test_builder_overrides() {
        let config = EventBusConfig::default()
            .with_max_handler_execution_time(Duration::from_millis(50))
            .with_history_capacity(3)
            .with_error_recovery(true)
            .with_abort_on_timeout(true);
        assert_eq!(config.max_handler_execution_time, Duration::from_millis(50));
        assert_eq!(config.history_capacity, 3);
        assert!(config.error_recovery);
        assert!(config.abort_on_timeout);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
