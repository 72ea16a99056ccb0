use crate::cli::OutputFormat;

pub mod format;
mod human;
mod json;

use rpcload_core::Plan;
use rpcload_core::runner::{ProgressFn, RunSummary};

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, plan: &Plan, base_url: &str);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
