use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Barrier;
use tokio::time::MissedTickBehavior;

use crate::HttpClient;
use crate::plan::Plan;

use super::error::{Error, Result};
use super::gate::IterationGate;
use super::progress::{LiveMetrics, ProgressFn, ProgressUpdate};
use super::stats::{RequestMeta, RunStats, RunSummary};
use super::vu::{StartSignal, VuContext};

/// Execute a plan against `base_url` with constant VUs.
///
/// Every VU shares one pooled client and one iteration gate. Request
/// failures are recorded in the stats and never abort the run; the only
/// hard errors are invalid configuration and task join failures.
pub async fn run_plan(
    plan: &Plan,
    base_url: &str,
    timeout: Option<Duration>,
    progress: Option<ProgressFn>,
) -> Result<RunSummary> {
    if plan.vus == 0 {
        return Err(Error::InvalidVus);
    }
    if plan.iterations == Some(0) {
        return Err(Error::InvalidIterations);
    }

    let parsed =
        url::Url::parse(base_url).map_err(|_| Error::InvalidBaseUrl(base_url.to_string()))?;
    if parsed.scheme() != "http" {
        return Err(Error::InvalidBaseUrl(base_url.to_string()));
    }

    let url: Arc<str> = Arc::from(plan.url(base_url));
    let plan_name: Arc<str> = Arc::from(plan.name);

    let client = HttpClient::default();
    let stats = Arc::new(RunStats::default());
    let gate = Arc::new(IterationGate::new(plan.iterations, plan.duration));

    let vus = plan.vus.min(usize::MAX as u64) as usize;
    let ready_barrier = Arc::new(Barrier::new(vus + 1));
    let start_signal = Arc::new(StartSignal::new());

    let mut handles = Vec::with_capacity(vus);
    for vu_id in 1..=plan.vus {
        let ctx = VuContext {
            vu_id,
            plan: plan_name.clone(),
            url: url.clone(),
            timeout,
            pause: plan.pause,
            client: client.clone(),
            stats: stats.clone(),
            gate: gate.clone(),

            ready_barrier: ready_barrier.clone(),
            start_signal: start_signal.clone(),
        };

        handles.push(tokio::spawn(run_vu(ctx)));
    }

    // All VUs are spawned and parked before the clock starts, so the first
    // measured second is not skewed by task startup.
    ready_barrier.wait().await;

    let started = Instant::now();
    gate.start_at(started);
    start_signal.start();

    let progress_handle = progress.map(|progress| {
        let stats = stats.clone();
        let plan_name = plan_name.clone();
        let vus = plan.vus;
        let total_duration = plan.duration;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of `interval` fires immediately.
            interval.tick().await;

            let mut tick_id: u64 = 0;
            let mut last_at = started;
            let mut last = TickTotals::snapshot(&stats);

            loop {
                interval.tick().await;

                tick_id = tick_id.saturating_add(1);
                let now = Instant::now();
                let dt = now.duration_since(last_at);
                last_at = now;
                let dt_s = dt.as_secs_f64().max(1e-9);

                let current = TickTotals::snapshot(&stats);
                let delta = current.delta(&last);

                let rps_now = (delta.requests as f64) / dt_s;
                stats.record_rps_sample(rps_now);

                let metrics = LiveMetrics {
                    rps_now,
                    failed_rps_now: (delta.failed as f64) / dt_s,
                    iterations_per_sec_now: (delta.iterations as f64) / dt_s,
                    bytes_received_per_sec_now: ((delta.bytes_received as f64) / dt_s).round()
                        as u64,
                    bytes_sent_per_sec_now: ((delta.bytes_sent as f64) / dt_s).round() as u64,

                    requests_total: current.requests,
                    failed_requests_total: current.failed,
                    iterations_total: current.iterations,
                    bytes_received_total: current.bytes_received,
                    bytes_sent_total: current.bytes_sent,

                    latency_window: stats.take_latency_window_ms(),

                    errors_now: delta.errors,
                };

                (progress)(ProgressUpdate {
                    tick: tick_id,
                    elapsed: started.elapsed(),
                    interval: dt,
                    plan: plan_name.to_string(),
                    vus,
                    total_duration,
                    metrics,
                });

                last = current;
            }
        })
    });

    for h in handles {
        h.await?;
    }

    if let Some(h) = progress_handle {
        h.abort();
        let _ = h.await;
    }

    Ok(stats.summarize(started.elapsed()))
}

async fn run_vu(ctx: VuContext) {
    ctx.ready_barrier.wait().await;
    ctx.start_signal.wait().await;

    while ctx.gate.next() {
        let started = Instant::now();

        let meta = match ctx.client.get(ctx.url.as_ref(), ctx.timeout).await {
            Ok(res) => RequestMeta {
                status: Some(res.status),
                transport_error_kind: None,
                elapsed: started.elapsed(),
                bytes_received: res.bytes_received,
                bytes_sent: res.bytes_sent,
            },
            // Failures never stop the loop; they only show up in the
            // aggregated report.
            Err(err) => RequestMeta {
                status: None,
                transport_error_kind: Some(err.transport_error_kind()),
                elapsed: started.elapsed(),
                bytes_received: 0,
                bytes_sent: 0,
            },
        };

        ctx.stats.record_request(meta);
        ctx.stats.record_iteration();

        if let Some(pause) = ctx.pause {
            tokio::time::sleep(pause).await;
        }
    }
}

#[derive(Debug, Clone)]
struct TickTotals {
    requests: u64,
    failed: u64,
    iterations: u64,
    bytes_received: u64,
    bytes_sent: u64,
    errors: HashMap<String, u64>,
}

impl TickTotals {
    fn snapshot(stats: &RunStats) -> Self {
        Self {
            requests: stats.requests_total(),
            failed: stats.failed_requests_total(),
            iterations: stats.iterations_total(),
            bytes_received: stats.bytes_received_total(),
            bytes_sent: stats.bytes_sent_total(),
            errors: stats.errors_snapshot(),
        }
    }

    fn delta(&self, last: &Self) -> TickDelta {
        let mut errors: HashMap<String, u64> = HashMap::new();
        for (label, total) in &self.errors {
            let prev = last.errors.get(label).copied().unwrap_or(0);
            let delta = total.saturating_sub(prev);
            if delta != 0 {
                errors.insert(label.clone(), delta);
            }
        }

        TickDelta {
            requests: self.requests.saturating_sub(last.requests),
            failed: self.failed.saturating_sub(last.failed),
            iterations: self.iterations.saturating_sub(last.iterations),
            bytes_received: self.bytes_received.saturating_sub(last.bytes_received),
            bytes_sent: self.bytes_sent.saturating_sub(last.bytes_sent),
            errors,
        }
    }
}

#[derive(Debug)]
struct TickDelta {
    requests: u64,
    failed: u64,
    iterations: u64,
    bytes_received: u64,
    bytes_sent: u64,
    errors: HashMap<String, u64>,
}
