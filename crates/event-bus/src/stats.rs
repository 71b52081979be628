//! Running counters kept by the bus for introspection.

use std::collections::HashMap;
use std::time::Duration;

use crate::handler::SubscriptionId;

/// Bus-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BusStats {
    /// Events accepted for dispatch.
    pub events_published: u64,

    /// Handler invocations that completed successfully.
    pub events_handled: u64,

    /// Handler failures plus publishes aborted by security or middleware.
    pub error_count: u64,

    /// Running mean of publish processing time.
    pub average_processing_time: Duration,
}

/// Per-subscription counters, retained after the subscription is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerStats {
    pub calls: u64,
    pub errors: u64,
    pub total_execution_time: Duration,
}

impl HandlerStats {
    /// Mean execution time per call.
    pub fn average_execution_time(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.total_execution_time.as_secs_f64() / self.calls as f64)
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    bus: BusStats,
    handlers: HashMap<SubscriptionId, HandlerStats>,
}

impl StatsRecorder {
    pub(crate) fn record_publish(&mut self, processing_time: Duration) {
        self.bus.events_published += 1;
        let n = self.bus.events_published as f64;
        let avg = self.bus.average_processing_time.as_secs_f64();
        let next = avg + (processing_time.as_secs_f64() - avg) / n;
        self.bus.average_processing_time = Duration::from_secs_f64(next.max(0.0));
    }

    pub(crate) fn record_rejection(&mut self) {
        self.bus.error_count += 1;
    }

    pub(crate) fn record_handler(&mut self, id: SubscriptionId, elapsed: Duration, success: bool) {
        let stats = self.handlers.entry(id).or_default();
        stats.calls += 1;
        stats.total_execution_time += elapsed;
        if success {
            self.bus.events_handled += 1;
        } else {
            stats.errors += 1;
            self.bus.error_count += 1;
        }
    }

    pub(crate) fn bus(&self) -> BusStats {
        self.bus
    }

    pub(crate) fn handler(&self, id: SubscriptionId) -> Option<HandlerStats> {
        self.handlers.get(&id).copied()
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_of_processing_time() {
        let mut recorder = StatsRecorder::default();
        recorder.record_publish(Duration::from_millis(10));
        recorder.record_publish(Duration::from_millis(30));

        let stats = recorder.bus();
        assert_eq!(stats.events_published, 2);
        let avg_ms = stats.average_processing_time.as_secs_f64() * 1000.0;
        assert!((avg_ms - 20.0).abs() < 0.01);
    }

    #[test]
    fn handler_counters_split_success_and_failure() {
        let mut recorder = StatsRecorder::default();
        let id = SubscriptionId::new();
        recorder.record_handler(id, Duration::from_millis(4), true);
        recorder.record_handler(id, Duration::from_millis(2), false);

        let stats = recorder.handler(id).unwrap();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.total_execution_time, Duration::from_millis(6));
        let avg_ms = stats.average_execution_time().as_secs_f64() * 1000.0;
        assert!((avg_ms - 3.0).abs() < 0.001);

        let bus = recorder.bus();
        assert_eq!(bus.events_handled, 1);
        assert_eq!(bus.error_count, 1);
    }

    #[test]
    fn average_execution_time_past_u32_calls() {
        let stats = HandlerStats {
            calls: 1 << 32,
            errors: 0,
            total_execution_time: Duration::from_secs(1 << 32),
        };
        let avg = stats.average_execution_time().as_secs_f64();
        assert!((avg - 1.0).abs() < 1e-6);
    }
}
