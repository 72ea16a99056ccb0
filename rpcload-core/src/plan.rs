use std::time::Duration;

/// Base URL the gateway listens on when everything runs inside compose.
pub const DEFAULT_BASE_URL: &str = "http://host.docker.internal:8000";

/// A built-in load scenario against the gateway.
///
/// A plan is a fixed endpoint, a constant VU count, and either a wall-clock
/// duration or a shared iteration cap. With neither set, a plan runs a
/// single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub name: &'static str,
    pub summary: &'static str,
    pub path: &'static str,
    pub vus: u64,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
    /// Sleep after each iteration, before the gate is consulted again.
    pub pause: Option<Duration>,
}

/// CLI-level overrides applied on top of a plan's shipped configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOverrides {
    pub vus: Option<u64>,
    pub duration: Option<Duration>,
    pub iterations: Option<u64>,
    pub pause: Option<Duration>,
}

/// Flood the block-number endpoint: 100 VUs for 30 minutes, no pause.
/// A per-iteration pause can be added at run time with `--pause`.
pub fn blocknumber_flood() -> Plan {
    Plan {
        name: "blocknumber-flood",
        summary: "hammer GET /blocknumber with 100 VUs for 30m",
        path: "/blocknumber",
        vus: 100,
        duration: Some(Duration::from_secs(30 * 60)),
        iterations: None,
        pause: None,
    }
}

/// Probe the healthcheck endpoint once, pausing 1s after the request.
pub fn health_check() -> Plan {
    Plan {
        name: "health-check",
        summary: "GET /health once per iteration with a 1s pause",
        path: "/health",
        vus: 1,
        duration: None,
        iterations: None,
        pause: Some(Duration::from_secs(1)),
    }
}

pub fn builtin() -> Vec<Plan> {
    vec![blocknumber_flood(), health_check()]
}

pub fn find(name: &str) -> Option<Plan> {
    builtin().into_iter().find(|p| p.name == name)
}

impl Plan {
    /// Join the plan's endpoint path onto a base URL.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path)
    }

    /// Apply CLI overrides. An explicit `--iterations` drops the shipped
    /// duration (and vice versa) so the run shape is what the user asked for.
    #[must_use]
    pub fn apply(mut self, overrides: PlanOverrides) -> Self {
        if let Some(vus) = overrides.vus {
            self.vus = vus;
        }

        match (overrides.duration, overrides.iterations) {
            (Some(d), Some(n)) => {
                self.duration = Some(d);
                self.iterations = Some(n);
            }
            (Some(d), None) => {
                self.duration = Some(d);
                self.iterations = None;
            }
            (None, Some(n)) => {
                self.duration = None;
                self.iterations = Some(n);
            }
            (None, None) => {}
        }

        if let Some(pause) = overrides.pause {
            self.pause = Some(pause);
        }

        self
    }
}
