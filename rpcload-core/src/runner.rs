mod error;
mod gate;
mod progress;
mod run;
mod stats;
mod vu;

pub use error::{Error, Result};
pub use gate::IterationGate;
pub use progress::{LiveMetrics, ProgressFn, ProgressUpdate};
pub use run::run_plan;
pub use stats::{LatencySnapshotMs, RequestMeta, RunStats, RunSummary};
pub use vu::{StartSignal, VuContext};
