//! In-repo stand-in for the Go JSON-RPC gateway the load plans target.
//!
//! Serves the two routes the plans exercise (`/health`, `/blocknumber`)
//! with response shapes matching the gateway's handlers, and counts
//! requests per route so e2e tests can assert on observed traffic.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const PATH_HEALTH: &str = "/health";
pub const PATH_BLOCKNUMBER: &str = "/blocknumber";

#[derive(Debug, Clone, Default)]
pub struct GatewayStats {
    health_total: Arc<AtomicU64>,
    blocknumber_total: Arc<AtomicU64>,
    block_number: Arc<AtomicU64>,
}

impl GatewayStats {
    pub fn health_total(&self) -> u64 {
        self.health_total.load(Ordering::Relaxed)
    }

    pub fn blocknumber_total(&self) -> u64 {
        self.blocknumber_total.load(Ordering::Relaxed)
    }

    pub fn requests_total(&self) -> u64 {
        self.health_total().saturating_add(self.blocknumber_total())
    }
}

#[derive(Debug, Serialize)]
struct HealthcheckBody {
    status: u16,
    message: &'static str,
    datetime: String,
}

#[derive(Debug, Serialize)]
struct BlockNumberBody {
    jsonrpc: &'static str,
    id: u32,
    result: String,
}

async fn handle_health(State(stats): State<GatewayStats>) -> impl IntoResponse {
    stats.health_total.fetch_add(1, Ordering::Relaxed);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    // The gateway writes HTTP 200 with an Accepted status in the body.
    Json(HealthcheckBody {
        status: StatusCode::ACCEPTED.as_u16(),
        message: "Healthcheck response",
        datetime: now.to_string(),
    })
}

async fn handle_blocknumber(State(stats): State<GatewayStats>) -> impl IntoResponse {
    stats.blocknumber_total.fetch_add(1, Ordering::Relaxed);
    let n = stats.block_number.fetch_add(1, Ordering::Relaxed) + 0x10d4f;

    Json(BlockNumberBody {
        jsonrpc: "2.0",
        id: 1,
        result: format!("{n:#x}"),
    })
}

pub fn router(stats: GatewayStats) -> Router {
    Router::new()
        .route(PATH_HEALTH, get(handle_health))
        .route("/", get(handle_health))
        .route(PATH_BLOCKNUMBER, get(handle_blocknumber))
        .with_state(stats)
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: GatewayStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = GatewayStats::default();
        let app = router(stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
