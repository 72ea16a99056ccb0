use clap::{Args, Parser, Subcommand};
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 30m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 30m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 30m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 30m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary with a live progress bar.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "rpcload",
    author,
    version,
    about = "Load driver for the JSON-RPC gateway",
    long_about = "rpcload drives fixed load scenarios against the gateway's HTTP endpoints.\n\nScenarios are built in and carry the virtual-user count, duration, and pause they shipped with; CLI flags override them per run.",
    after_help = "Examples:\n  rpcload list\n  rpcload run health-check\n  rpcload run blocknumber-flood --base-url http://127.0.0.1:8000\n  rpcload run blocknumber-flood --vus 10 --duration 30s --output json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a built-in load scenario
    #[command(
        long_about = "Run a built-in scenario against the gateway.\n\nCLI flags override the scenario's shipped configuration; --iterations replaces a shipped duration (and vice versa)."
    )]
    Run(RunArgs),

    /// List built-in scenarios and their shipped configuration
    List,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Scenario name (see `rpcload list`)
    pub scenario: String,

    /// Gateway base URL
    #[arg(
        long,
        env = "BASE_URL",
        default_value = rpcload_core::plan::DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Number of virtual users
    #[arg(long)]
    pub vus: Option<u64>,

    /// Test duration (e.g. 10s, 250ms, 30m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Total iterations across all VUs (replaces a shipped duration)
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Sleep after each iteration (e.g. 1s)
    #[arg(long, value_parser = parse_duration)]
    pub pause: Option<Duration>,

    /// Per-request timeout (no timeout if unset)
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
