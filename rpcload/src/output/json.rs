use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;

use rpcload_core::Plan;
use rpcload_core::runner::{ProgressFn, ProgressUpdate, RunSummary};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _plan: &Plan, _base_url: &str) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        let line = build_summary_line(summary);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatency {
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub mean_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub scenario: String,
    pub elapsed_secs: u64,
    pub interval_secs: f64,
    pub vus: u64,

    pub requests_per_sec: f64,
    pub failed_per_sec: f64,
    pub iterations_per_sec: f64,
    pub bytes_received_per_sec: u64,
    pub bytes_sent_per_sec: u64,

    pub total_requests: u64,
    pub total_failed: u64,
    pub total_iterations: u64,
    pub total_bytes_received: u64,
    pub total_bytes_sent: u64,

    pub latency: Option<JsonLatency>,
    pub errors_now: BTreeMap<String, u64>,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    let latency = u.metrics.latency_window.as_ref().map(|l| JsonLatency {
        p50_ms: l.p50_ms as f64,
        p90_ms: l.p90_ms as f64,
        p99_ms: l.p99_ms as f64,
        mean_ms: l.mean_ms,
        max_ms: l.max_ms as f64,
    });

    JsonProgressLine {
        kind: "progress",
        scenario: u.plan.clone(),
        elapsed_secs: u.elapsed.as_secs(),
        interval_secs: u.interval.as_secs_f64(),
        vus: u.vus,

        requests_per_sec: u.metrics.rps_now,
        failed_per_sec: u.metrics.failed_rps_now,
        iterations_per_sec: u.metrics.iterations_per_sec_now,
        bytes_received_per_sec: u.metrics.bytes_received_per_sec_now,
        bytes_sent_per_sec: u.metrics.bytes_sent_per_sec_now,

        total_requests: u.metrics.requests_total,
        total_failed: u.metrics.failed_requests_total,
        total_iterations: u.metrics.iterations_total,
        total_bytes_received: u.metrics.bytes_received_total,
        total_bytes_sent: u.metrics.bytes_sent_total,

        latency,
        errors_now: u.metrics.errors_now.iter().map(|(k, v)| (k.clone(), *v)).collect(),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLatency {
    pub p50_ms: Option<f64>,
    pub p75_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub mean_ms: Option<f64>,
    pub stdev_ms: Option<f64>,
    pub max_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub iterations_total: u64,
    pub status_2xx: u64,
    pub status_4xx: u64,
    pub status_5xx: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,

    pub run_duration_ms: u64,
    pub requests_per_sec: f64,
    pub req_per_sec_avg: f64,
    pub req_per_sec_stdev: f64,
    pub req_per_sec_max: f64,

    pub latency: JsonSummaryLatency,
    pub errors: BTreeMap<String, u64>,
}

fn build_summary_line(summary: &RunSummary) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",

        requests_total: summary.requests_total,
        failed_requests_total: summary.failed_requests_total,
        iterations_total: summary.iterations_total,
        status_2xx: summary.status_2xx,
        status_4xx: summary.status_4xx,
        status_5xx: summary.status_5xx,
        bytes_received_total: summary.bytes_received_total,
        bytes_sent_total: summary.bytes_sent_total,

        run_duration_ms: summary.run_duration_ms,
        requests_per_sec: summary.rps,
        req_per_sec_avg: summary.req_per_sec_avg,
        req_per_sec_stdev: summary.req_per_sec_stdev,
        req_per_sec_max: summary.req_per_sec_max,

        latency: JsonSummaryLatency {
            p50_ms: summary.latency_p50_ms,
            p75_ms: summary.latency_p75_ms,
            p90_ms: summary.latency_p90_ms,
            p95_ms: summary.latency_p95_ms,
            p99_ms: summary.latency_p99_ms,
            mean_ms: summary.latency_mean_ms,
            stdev_ms: summary.latency_stdev_ms,
            max_ms: summary.latency_max_ms,
        },
        errors: summary.errors.iter().cloned().collect(),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
