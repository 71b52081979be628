//! Operation timing.

use std::sync::Mutex;
use std::time::Duration;

/// Receives the duration and outcome of every service operation.
pub trait PerformanceMonitor: Send + Sync {
    fn record(&self, operation: &str, duration: Duration, success: bool);
}

/// Forwards timings to the `metrics` facade as
/// `domain_operation_duration_seconds` and `domain_operations_total`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsMonitor;

impl PerformanceMonitor for MetricsMonitor {
    fn record(&self, operation: &str, duration: Duration, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        metrics::histogram!("domain_operation_duration_seconds", "operation" => operation.to_string())
            .record(duration.as_secs_f64());
        metrics::counter!(
            "domain_operations_total",
            "operation" => operation.to_string(),
            "outcome" => outcome
        )
        .increment(1);
    }
}

/// A single recorded timing.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSample {
    pub operation: String,
    pub duration: Duration,
    pub success: bool,
}

/// Monitor that keeps every sample in memory.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    samples: Mutex<Vec<OperationSample>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<OperationSample> {
        self.samples
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl PerformanceMonitor for RecordingMonitor {
    fn record(&self, operation: &str, duration: Duration, success: bool) {
        self.samples
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(OperationSample {
                operation: operation.to_string(),
                duration,
                success,
            });
    }
}
