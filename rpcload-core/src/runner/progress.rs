use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::stats::LatencySnapshotMs;

/// Per-tick live metrics, sampled by the runner's progress task.
#[derive(Debug, Clone)]
pub struct LiveMetrics {
    pub rps_now: f64,
    pub failed_rps_now: f64,
    pub iterations_per_sec_now: f64,
    pub bytes_received_per_sec_now: u64,
    pub bytes_sent_per_sec_now: u64,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,

    /// Latency over the last tick only; `None` if no request completed.
    pub latency_window: Option<LatencySnapshotMs>,

    /// New failure labels observed during this tick.
    pub errors_now: HashMap<String, u64>,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub tick: u64,
    pub elapsed: Duration,
    pub interval: Duration,
    pub plan: String,
    pub vus: u64,
    /// Total duration of the run, when the plan is duration-bound.
    pub total_duration: Option<Duration>,
    pub metrics: LiveMetrics,
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
