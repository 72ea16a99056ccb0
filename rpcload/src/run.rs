use anyhow::anyhow;

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

use rpcload_core::plan::{self, PlanOverrides};
use rpcload_core::runner;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let plan = plan::find(&args.scenario).ok_or_else(|| {
        let known = plan::builtin()
            .iter()
            .map(|p| p.name)
            .collect::<Vec<_>>()
            .join(", ");
        RunError::InvalidInput(anyhow!(
            "unknown scenario `{}` (expected one of: {known})",
            args.scenario
        ))
    })?;

    let plan = plan.apply(PlanOverrides {
        vus: args.vus,
        duration: args.duration,
        iterations: args.iterations,
        pause: args.pause,
    });

    let out = output::formatter(args.output);
    out.print_header(&plan, &args.base_url);

    let summary = runner::run_plan(&plan, &args.base_url, args.timeout, out.progress())
        .await
        .map_err(|err| match err {
            runner::Error::InvalidVus
            | runner::Error::InvalidIterations
            | runner::Error::InvalidBaseUrl(_) => RunError::InvalidInput(err.into()),
            runner::Error::Join(_) => RunError::RuntimeError(err.into()),
        })?;

    out.print_summary(&summary)
        .map_err(RunError::RuntimeError)?;

    Ok(ExitCode::from_run(summary.failed_requests_total))
}
