use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use rpcload_core::Plan;
use rpcload_core::runner::{ProgressFn, RunSummary};

use super::OutputFormatter;
use super::format::{format_bytes, format_duration, format_ms_opt, format_rate};

pub(crate) struct HumanReadableOutput {
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            bar: Arc::new(Mutex::new(None)),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, plan: &Plan, base_url: &str) {
        let shape = match (plan.duration, plan.iterations) {
            (Some(d), _) => format!("duration={}", format_duration(d)),
            (None, Some(n)) => format!("iterations={n}"),
            (None, None) => "iterations=1".to_string(),
        };
        println!(
            "scenario: {} url={} vus={} {shape}",
            plan.name,
            plan.url(base_url),
            plan.vus
        );
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let bar = self.bar.clone();

        Some(Arc::new(move |u| {
            let mut guard = bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let pb = guard.get_or_insert_with(|| new_bar(u.total_duration));

            let dt = u.interval.as_secs_f64().max(1e-9);
            let throughput_per_sec = u
                .metrics
                .bytes_received_per_sec_now
                .saturating_add(u.metrics.bytes_sent_per_sec_now);
            let errors_now = ((u.metrics.failed_rps_now * dt).round()) as u64;

            let mut msg = format!(
                "vus={} elapsed={} iters/s={} rps={} tps={}/s errors={errors_now}/{}",
                u.vus,
                format_duration(u.elapsed),
                format_rate(u.metrics.iterations_per_sec_now),
                format_rate(u.metrics.rps_now),
                format_bytes(throughput_per_sec),
                u.metrics.failed_requests_total,
            );
            if let Some(lat) = &u.metrics.latency_window {
                let _ = write!(msg, " p50={}ms p99={}ms", lat.p50_ms, lat.p99_ms);
            }
            pb.set_message(msg);

            match u.total_duration {
                Some(total) => {
                    let total_ms = total.as_millis() as u64;
                    let elapsed_ms = u.elapsed.as_millis() as u64;
                    pb.set_length(total_ms);
                    pb.set_position(elapsed_ms.min(total_ms));
                }
                None => pb.tick(),
            }
        }))
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        {
            let mut guard = self
                .bar
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }

        print!("{}", render(summary));
        Ok(())
    }
}

fn new_bar(total_duration: Option<Duration>) -> ProgressBar {
    let pb = match total_duration {
        Some(total) => {
            let pb = ProgressBar::new(total.as_millis() as u64);
            if let Ok(style) =
                ProgressStyle::with_template("[{bar:24}] {percent:>3}% {wide_msg}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner} {wide_msg}") {
                pb.set_style(style);
            }
            pb
        }
    };

    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
    pb
}

fn render(summary: &RunSummary) -> String {
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(
        &mut out,
        "  requests: {} (failed {})",
        summary.requests_total, summary.failed_requests_total
    )
    .ok();
    writeln!(&mut out, "  iterations: {}", summary.iterations_total).ok();
    writeln!(
        &mut out,
        "  status: 2xx={} 4xx={} 5xx={}",
        summary.status_2xx, summary.status_4xx, summary.status_5xx
    )
    .ok();
    writeln!(
        &mut out,
        "  bytes: recv {} sent {}",
        format_bytes(summary.bytes_received_total),
        format_bytes(summary.bytes_sent_total)
    )
    .ok();
    writeln!(
        &mut out,
        "  duration: {}",
        format_duration(Duration::from_millis(summary.run_duration_ms))
    )
    .ok();
    writeln!(
        &mut out,
        "  rates: rps={} (avg={} stdev={} max={})",
        format_rate(summary.rps),
        format_rate(summary.req_per_sec_avg),
        format_rate(summary.req_per_sec_stdev),
        format_rate(summary.req_per_sec_max)
    )
    .ok();

    if summary.latency_mean_ms.is_some() {
        writeln!(
            &mut out,
            "  latency: p50={} p90={} p95={} p99={} mean={} max={}",
            format_ms_opt(summary.latency_p50_ms),
            format_ms_opt(summary.latency_p90_ms),
            format_ms_opt(summary.latency_p95_ms),
            format_ms_opt(summary.latency_p99_ms),
            format_ms_opt(summary.latency_mean_ms),
            format_ms_opt(summary.latency_max_ms.map(|v| v as f64)),
        )
        .ok();
    } else {
        out.push_str("  latency: n/a\n");
    }

    if !summary.errors.is_empty() {
        out.push_str("  errors:\n");
        for (label, count) in &summary.errors {
            writeln!(&mut out, "    {label}: {count}").ok();
        }
    }

    out
}
