use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use rpcload_core::plan::{self, PlanOverrides};
use rpcload_core::runner::{self, ProgressUpdate};
use rpcload_testserver::TestServer;

#[tokio::test]
async fn health_check_runs_one_iteration_and_pauses() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let plan = plan::health_check();
    let started = Instant::now();
    let summary = runner::run_plan(&plan, server.base_url(), None, None).await?;
    let elapsed = started.elapsed();

    assert_eq!(server.stats().health_total(), 1);
    server.shutdown().await;

    assert_eq!(summary.requests_total, 1);
    assert_eq!(summary.iterations_total, 1);
    assert_eq!(summary.status_2xx, 1);
    assert_eq!(summary.failed_requests_total, 0);
    assert!(
        elapsed >= Duration::from_secs(1),
        "1s pause should run even after the last iteration, took {elapsed:?}"
    );

    Ok(())
}

#[tokio::test]
async fn blocknumber_iterations_are_spread_across_vus() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let plan = plan::blocknumber_flood().apply(PlanOverrides {
        vus: Some(4),
        iterations: Some(20),
        ..PlanOverrides::default()
    });

    let summary = runner::run_plan(&plan, server.base_url(), None, None).await?;

    assert_eq!(server.stats().blocknumber_total(), 20);
    server.shutdown().await;

    assert_eq!(summary.requests_total, 20);
    assert_eq!(summary.iterations_total, 20);
    assert_eq!(summary.status_2xx, 20);
    assert_eq!(summary.failed_requests_total, 0);
    assert!(summary.bytes_received_total > 0);
    assert!(summary.bytes_sent_total > 0);

    Ok(())
}

#[tokio::test]
async fn request_failures_are_recorded_not_raised() -> anyhow::Result<()> {
    // Bind and immediately drop a listener to get a port nothing serves.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?.port()
    };
    let base_url = format!("http://127.0.0.1:{port}");

    let plan = plan::health_check().apply(PlanOverrides {
        iterations: Some(3),
        pause: Some(Duration::from_millis(1)),
        ..PlanOverrides::default()
    });

    let summary = runner::run_plan(&plan, &base_url, None, None).await?;

    assert_eq!(summary.requests_total, 3);
    assert_eq!(summary.failed_requests_total, 3);
    assert_eq!(summary.iterations_total, 3);
    assert!(
        summary
            .errors
            .iter()
            .any(|(label, count)| label.starts_with("http_error:") && *count == 3),
        "expected a transport error label, got {:?}",
        summary.errors
    );

    Ok(())
}

#[tokio::test]
async fn progress_ticks_carry_live_totals() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let plan = plan::blocknumber_flood().apply(PlanOverrides {
        vus: Some(2),
        duration: Some(Duration::from_millis(2500)),
        ..PlanOverrides::default()
    });

    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = updates.clone();
    let progress: runner::ProgressFn = Arc::new(move |u| {
        let mut inner = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.push(u);
    });

    let summary = runner::run_plan(&plan, server.base_url(), None, Some(progress)).await?;
    server.shutdown().await;

    let updates = updates
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    assert!(!updates.is_empty(), "expected at least one progress tick");
    let last = updates.last().context("no updates")?;
    assert_eq!(last.plan, "blocknumber-flood");
    assert_eq!(last.vus, 2);
    assert_eq!(last.total_duration, Some(Duration::from_millis(2500)));
    assert!(last.metrics.requests_total > 0);
    assert!(last.metrics.requests_total <= summary.requests_total);

    // rps samples recorded by the ticker feed the final summary.
    assert!(summary.req_per_sec_avg > 0.0);

    Ok(())
}

#[tokio::test]
async fn invalid_base_url_is_rejected() {
    let plan = plan::health_check();

    let err = runner::run_plan(&plan, "ftp://example.com", None, None).await;
    assert!(matches!(err, Err(runner::Error::InvalidBaseUrl(_))));

    let err = runner::run_plan(&plan, "not a url", None, None).await;
    assert!(matches!(err, Err(runner::Error::InvalidBaseUrl(_))));
}

#[tokio::test]
async fn zero_vus_is_rejected() {
    let plan = plan::health_check().apply(PlanOverrides {
        vus: Some(0),
        ..PlanOverrides::default()
    });

    let err = runner::run_plan(&plan, "http://127.0.0.1:1", None, None).await;
    assert!(matches!(err, Err(runner::Error::InvalidVus)));
}
