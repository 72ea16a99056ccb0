use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::sync::Notify;

use crate::HttpClient;

use super::gate::IterationGate;
use super::stats::RunStats;

/// One-shot broadcast that releases all VUs at the same instant.
#[derive(Debug)]
pub struct StartSignal {
    started: AtomicBool,
    notify: Notify,
}

impl StartSignal {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn start(&self) {
        self.started.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        while !self.started.load(Ordering::Acquire) {
            self.notify.notified().await;
        }
    }
}

impl Default for StartSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a spawned VU task needs to run its iteration loop.
#[derive(Debug, Clone)]
pub struct VuContext {
    pub vu_id: u64,
    pub plan: Arc<str>,
    pub url: Arc<str>,
    pub timeout: Option<Duration>,
    pub pause: Option<Duration>,
    pub client: HttpClient,
    pub stats: Arc<RunStats>,
    pub gate: Arc<IterationGate>,

    pub ready_barrier: Arc<Barrier>,
    pub start_signal: Arc<StartSignal>,
}
