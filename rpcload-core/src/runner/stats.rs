use hdrhistogram::Histogram;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::HttpTransportErrorKind;

/// Outcome of a single GET, as observed by the runner.
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta {
    pub status: Option<u16>,
    /// If set, the request failed before a status was received.
    pub transport_error_kind: Option<HttpTransportErrorKind>,
    pub elapsed: Duration,
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub status_2xx: u64,
    pub status_4xx: u64,
    pub status_5xx: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    pub run_duration_ms: u64,
    pub rps: f64,
    pub req_per_sec_avg: f64,
    pub req_per_sec_stdev: f64,
    pub req_per_sec_max: f64,
    pub latency_p50_ms: Option<f64>,
    pub latency_p75_ms: Option<f64>,
    pub latency_p90_ms: Option<f64>,
    pub latency_p95_ms: Option<f64>,
    pub latency_p99_ms: Option<f64>,
    pub latency_mean_ms: Option<f64>,
    pub latency_stdev_ms: Option<f64>,
    pub latency_max_ms: Option<u64>,

    /// Failure labels (`http_status:503`, `http_error:timeout`, ...) with counts.
    pub errors: Vec<(String, u64)>,
}

/// Aggregated counters for a run. Shared by every VU; atomics on the hot
/// path, a mutex only around the latency histograms and rps aggregation.
#[derive(Debug)]
pub struct RunStats {
    requests_total: AtomicU64,
    iterations_total: AtomicU64,
    transport_errors_total: AtomicU64,
    status_2xx: AtomicU64,
    status_4xx: AtomicU64,
    status_5xx: AtomicU64,
    bytes_received_total: AtomicU64,
    bytes_sent_total: AtomicU64,
    latency_us: Mutex<Histogram<u64>>,
    latency_us_window: Mutex<Histogram<u64>>,
    errors: Mutex<HashMap<String, u64>>,

    rps_samples: Mutex<RpsAgg>,
}

#[derive(Debug, Clone, Default)]
pub struct LatencySnapshotMs {
    pub mean_ms: f64,
    pub stdev_ms: f64,
    pub max_ms: u64,
    pub p50_ms: u64,
    pub p90_ms: u64,
    pub p99_ms: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct RpsAgg {
    count: u64,
    mean: f64,
    m2: f64,
    max: f64,
}

impl RpsAgg {
    fn record(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }

        self.count = self.count.saturating_add(1);
        let delta = sample - self.mean;
        self.mean += delta / (self.count as f64);
        let delta2 = sample - self.mean;
        self.m2 += delta * delta2;
        self.max = self.max.max(sample);
    }

    fn summary(&self) -> (f64, f64, f64) {
        if self.count == 0 {
            return (0.0, 0.0, 0.0);
        }

        let avg = self.mean;
        let stdev = if self.count >= 2 {
            (self.m2 / ((self.count - 1) as f64)).sqrt()
        } else {
            0.0
        };

        (avg, stdev, self.max)
    }
}

impl Default for RunStats {
    fn default() -> Self {
        fn new_hist() -> Histogram<u64> {
            // Track up to 60s in microseconds (with 3 sigfigs).
            Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
                .unwrap_or_else(|err| panic!("failed to init histogram: {err}"))
        }

        Self {
            requests_total: AtomicU64::new(0),
            iterations_total: AtomicU64::new(0),
            transport_errors_total: AtomicU64::new(0),
            status_2xx: AtomicU64::new(0),
            status_4xx: AtomicU64::new(0),
            status_5xx: AtomicU64::new(0),
            bytes_received_total: AtomicU64::new(0),
            bytes_sent_total: AtomicU64::new(0),
            latency_us: Mutex::new(new_hist()),
            latency_us_window: Mutex::new(new_hist()),
            errors: Mutex::new(HashMap::new()),

            rps_samples: Mutex::new(RpsAgg::default()),
        }
    }
}

impl RunStats {
    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn iterations_total(&self) -> u64 {
        self.iterations_total.load(Ordering::Relaxed)
    }

    pub fn bytes_received_total(&self) -> u64 {
        self.bytes_received_total.load(Ordering::Relaxed)
    }

    pub fn bytes_sent_total(&self) -> u64 {
        self.bytes_sent_total.load(Ordering::Relaxed)
    }

    pub fn failed_requests_total(&self) -> u64 {
        self.transport_errors_total.load(Ordering::Relaxed)
            + self.status_4xx.load(Ordering::Relaxed)
            + self.status_5xx.load(Ordering::Relaxed)
    }

    pub fn record_iteration(&self) {
        self.iterations_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rps_sample(&self, rps_now: f64) {
        let mut agg = self
            .rps_samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        agg.record(rps_now);
    }

    pub fn record_request(&self, req: RequestMeta) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        if let Some(kind) = req.transport_error_kind {
            self.transport_errors_total.fetch_add(1, Ordering::Relaxed);
            self.bump_error(&format!("http_error:{kind}"));
        } else if let Some(status) = req.status {
            match status {
                200..=299 => {
                    self.status_2xx.fetch_add(1, Ordering::Relaxed);
                }
                400..=499 => {
                    self.status_4xx.fetch_add(1, Ordering::Relaxed);
                    self.bump_error(&format!("http_status:{status}"));
                }
                500..=599 => {
                    self.status_5xx.fetch_add(1, Ordering::Relaxed);
                    self.bump_error(&format!("http_status:{status}"));
                }
                _ => {}
            }
        }

        self.record_latency(req.elapsed);

        if req.bytes_received != 0 {
            self.bytes_received_total
                .fetch_add(req.bytes_received, Ordering::Relaxed);
        }

        if req.bytes_sent != 0 {
            self.bytes_sent_total
                .fetch_add(req.bytes_sent, Ordering::Relaxed);
        }
    }

    fn bump_error(&self, label: &str) {
        let mut map = self
            .errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *map.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn errors_snapshot(&self) -> HashMap<String, u64> {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record_latency(&self, elapsed: Duration) {
        let us = elapsed.as_micros();
        if us == 0 {
            return;
        }

        let value = us as u64;

        {
            let mut h = self
                .latency_us
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = h.record(value);
        }

        {
            let mut h = self
                .latency_us_window
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let _ = h.record(value);
        }
    }

    /// Drain the per-tick latency window; used by the progress ticker.
    pub fn take_latency_window_ms(&self) -> Option<LatencySnapshotMs> {
        let mut h = self
            .latency_us_window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        #[allow(clippy::len_zero)]
        let out = if h.len() == 0 {
            None
        } else {
            Some(LatencySnapshotMs {
                mean_ms: h.mean() / 1000.0,
                stdev_ms: h.stdev() / 1000.0,
                max_ms: h.max() / 1000,
                p50_ms: h.value_at_quantile(0.50) / 1000,
                p90_ms: h.value_at_quantile(0.90) / 1000,
                p99_ms: h.value_at_quantile(0.99) / 1000,
            })
        };

        h.reset();
        out
    }

    pub fn summarize(&self, elapsed: Duration) -> RunSummary {
        let duration_ms = elapsed.as_millis() as u64;
        let secs = elapsed.as_secs_f64().max(1e-9);

        let requests_total = self.requests_total.load(Ordering::Relaxed);

        let (p50, p75, p90, p95, p99, mean, stdev, max) = {
            let h = self
                .latency_us
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            #[allow(clippy::len_zero)]
            if h.len() == 0 {
                (None, None, None, None, None, None, None, None)
            } else {
                (
                    Some(h.value_at_quantile(0.50) as f64 / 1000.0),
                    Some(h.value_at_quantile(0.75) as f64 / 1000.0),
                    Some(h.value_at_quantile(0.90) as f64 / 1000.0),
                    Some(h.value_at_quantile(0.95) as f64 / 1000.0),
                    Some(h.value_at_quantile(0.99) as f64 / 1000.0),
                    Some(h.mean() / 1000.0),
                    Some(h.stdev() / 1000.0),
                    Some(h.max() / 1000),
                )
            }
        };

        let (req_per_sec_avg, req_per_sec_stdev, req_per_sec_max) = {
            let agg = self
                .rps_samples
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            agg.summary()
        };

        let mut errors: Vec<(String, u64)> = self.errors_snapshot().into_iter().collect();
        errors.sort_by(|(a, _), (b, _)| a.cmp(b));

        RunSummary {
            requests_total,
            failed_requests_total: self.failed_requests_total(),
            iterations_total: self.iterations_total.load(Ordering::Relaxed),
            status_2xx: self.status_2xx.load(Ordering::Relaxed),
            status_4xx: self.status_4xx.load(Ordering::Relaxed),
            status_5xx: self.status_5xx.load(Ordering::Relaxed),
            bytes_received_total: self.bytes_received_total.load(Ordering::Relaxed),
            bytes_sent_total: self.bytes_sent_total.load(Ordering::Relaxed),
            run_duration_ms: duration_ms,
            rps: (requests_total as f64) / secs,
            req_per_sec_avg,
            req_per_sec_stdev,
            req_per_sec_max,
            latency_p50_ms: p50,
            latency_p75_ms: p75,
            latency_p90_ms: p90,
            latency_p95_ms: p95,
            latency_p99_ms: p99,
            latency_mean_ms: mean,
            latency_stdev_ms: stdev,
            latency_max_ms: max,

            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_meta(status: u16, elapsed_ms: u64) -> RequestMeta {
        RequestMeta {
            status: Some(status),
            transport_error_kind: None,
            elapsed: Duration::from_millis(elapsed_ms),
            bytes_received: 100,
            bytes_sent: 50,
        }
    }

    #[test]
    fn status_classes_are_counted() {
        let stats = RunStats::default();
        stats.record_request(ok_meta(200, 5));
        stats.record_request(ok_meta(202, 5));
        stats.record_request(ok_meta(404, 5));
        stats.record_request(ok_meta(503, 5));

        let summary = stats.summarize(Duration::from_secs(1));
        assert_eq!(summary.requests_total, 4);
        assert_eq!(summary.status_2xx, 2);
        assert_eq!(summary.status_4xx, 1);
        assert_eq!(summary.status_5xx, 1);
        assert_eq!(summary.failed_requests_total, 2);
        assert_eq!(summary.bytes_received_total, 400);
        assert_eq!(summary.bytes_sent_total, 200);
    }

    #[test]
    fn transport_errors_are_labelled() {
        let stats = RunStats::default();
        stats.record_request(RequestMeta {
            status: None,
            transport_error_kind: Some(HttpTransportErrorKind::Timeout),
            elapsed: Duration::from_millis(1000),
            bytes_received: 0,
            bytes_sent: 0,
        });

        assert_eq!(stats.failed_requests_total(), 1);
        let errors = stats.errors_snapshot();
        assert_eq!(errors.get("http_error:timeout"), Some(&1));
    }

    #[test]
    fn latency_percentiles_come_from_the_histogram() {
        let stats = RunStats::default();
        for ms in [10u64, 20, 30, 40] {
            stats.record_request(ok_meta(200, ms));
        }

        let summary = stats.summarize(Duration::from_secs(2));
        let p50 = summary.latency_p50_ms.unwrap_or(0.0);
        assert!(p50 >= 10.0 && p50 <= 31.0, "p50 was {p50}");
        assert!(summary.latency_max_ms.unwrap_or(0) >= 39);
        assert!((summary.rps - 2.0).abs() < 1e-9);
    }

    #[test]
    fn window_snapshot_resets_between_ticks() {
        let stats = RunStats::default();
        stats.record_request(ok_meta(200, 12));

        assert!(stats.take_latency_window_ms().is_some());
        assert!(stats.take_latency_window_ms().is_none());
    }

    #[test]
    fn rps_samples_aggregate_with_welford() {
        let stats = RunStats::default();
        stats.record_rps_sample(100.0);
        stats.record_rps_sample(200.0);

        let summary = stats.summarize(Duration::from_secs(1));
        assert!((summary.req_per_sec_avg - 150.0).abs() < 1e-9);
        assert!((summary.req_per_sec_max - 200.0).abs() < 1e-9);
        assert!(summary.req_per_sec_stdev > 0.0);
    }
}
