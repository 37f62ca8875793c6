//! Dispatch metrics collection
//!
//! Counter/histogram recorders backed by the process-wide metrics
//! recorder, plus an in-memory aggregator for shutdown summaries.

use metrics::{counter, histogram};

/// Record one inbound detection
pub fn record_detection_received() {
    counter!("chirp_relay_detections_total").increment(1);
}

/// Record the final outcome of one action instance
pub fn record_action_result(action: &'static str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "chirp_relay_actions_total",
        "action" => action,
        "status" => status
    )
    .increment(1);
}

/// Record one retry re-invocation
pub fn record_action_retry(action: &'static str) {
    counter!("chirp_relay_action_retries_total", "action" => action).increment(1);
}

/// Record how long a consistency wait blocked, labeled by stage
pub fn record_wait_latency_ms(stage: &'static str, latency_ms: u64) {
    histogram!("chirp_relay_wait_latency_ms", "stage" => stage).record(latency_ms as f64);
}

/// In-memory dispatch statistics
///
/// Aggregated on the dispatcher loop and printed once at shutdown; the
/// Prometheus recorders above carry the live view.
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// Total detections consumed from the input channel
    pub total_detections: u64,

    /// Fan-out width per detection
    pub fanout_stats: RunningStats,

    /// Classifier confidence distribution
    pub confidence_stats: RunningStats,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with one dispatched detection
    pub fn record(&mut self, actions: usize, confidence: f64) {
        self.total_detections += 1;
        self.fanout_stats.push(actions as f64);
        self.confidence_stats.push(confidence);
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl std::fmt::Display for DispatchStatsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "detections={} fanout(mean={:.2}, max={:.0}) confidence(mean={:.2}, min={:.2})",
            self.total_detections,
            self.fanout_stats.mean(),
            self.fanout_stats.max(),
            self.confidence_stats.mean(),
            self.confidence_stats.min()
        )
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Push a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum value
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum value
    pub fn max(&self) -> f64 {
        self.max
    }
}
