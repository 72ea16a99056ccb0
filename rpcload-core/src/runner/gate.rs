use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shared admission gate for VU iterations.
///
/// A VU calls [`next`](Self::next) before each iteration; the gate enforces
/// the plan's duration deadline and/or total iteration cap. With neither
/// configured, exactly one iteration runs across all VUs.
#[derive(Debug)]
pub struct IterationGate {
    counter: AtomicU64,
    iterations: Option<u64>,
    duration: Option<Duration>,
    deadline: OnceLock<Instant>,
}

impl IterationGate {
    pub fn new(iterations: Option<u64>, duration: Option<Duration>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            iterations,
            duration,
            deadline: OnceLock::new(),
        }
    }

    pub fn start_at(&self, started: Instant) {
        if self.deadline.get().is_some() {
            return;
        }

        if let Some(duration) = self.duration {
            let _ = self.deadline.set(started + duration);
        }
    }

    pub fn start(&self) {
        self.start_at(Instant::now());
    }

    pub fn next(&self) -> bool {
        // Hot path: skip timekeeping entirely unless duration mode is on.
        if self.duration.is_some() {
            let now = Instant::now();

            // If the runner never set a start time, anchor the deadline to
            // the first observed iteration.
            if self.deadline.get().is_none() {
                self.start_at(now);
            }

            if let Some(deadline) = self.deadline.get()
                && now >= *deadline
            {
                return false;
            }
        }

        if let Some(total) = self.iterations {
            let idx = self.counter.fetch_add(1, Ordering::Relaxed);
            if idx >= total {
                return false;
            }
        } else if self.duration.is_none() {
            // Neither iterations nor duration => run once.
            let idx = self.counter.fetch_add(1, Ordering::Relaxed);
            if idx > 0 {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_gate_admits_exactly_one_iteration() {
        let gate = IterationGate::new(None, None);
        assert!(gate.next());
        assert!(!gate.next());
        assert!(!gate.next());
    }

    #[test]
    fn iteration_cap_is_shared_across_callers() {
        let gate = IterationGate::new(Some(3), None);
        assert!(gate.next());
        assert!(gate.next());
        assert!(gate.next());
        assert!(!gate.next());
    }

    #[test]
    fn expired_deadline_closes_the_gate() {
        let gate = IterationGate::new(None, Some(Duration::from_millis(10)));
        gate.start_at(Instant::now() - Duration::from_millis(20));
        assert!(!gate.next());
    }

    #[test]
    fn open_deadline_admits_iterations() {
        let gate = IterationGate::new(None, Some(Duration::from_secs(60)));
        gate.start();
        assert!(gate.next());
        assert!(gate.next());
    }

    #[test]
    fn cap_applies_within_an_open_deadline() {
        let gate = IterationGate::new(Some(1), Some(Duration::from_secs(60)));
        gate.start();
        assert!(gate.next());
        assert!(!gate.next());
    }
}
