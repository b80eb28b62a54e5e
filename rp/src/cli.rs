//! CLI command definitions and subcommands

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// rp - drive a retrypool with a synthetic flaky workload
#[derive(Parser)]
#[command(
    name = "rp",
    about = "Bounded worker pool with jittered exponential-backoff retry",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/retrypool/logs/rp.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Submit synthetic tasks, stop the pool and print its statistics
    Run(RunArgs),

    /// Print the effective pool configuration
    Config,
}

/// Overrides for `rp run`; unset flags fall back to the config file
#[derive(Debug, Default, clap::Args)]
pub struct RunArgs {
    /// Number of tasks to submit
    #[arg(short, long)]
    pub tasks: Option<usize>,

    /// Probability that a single run fails
    #[arg(long)]
    pub fail_rate: Option<f64>,

    /// Upper bound on failures per task
    #[arg(long)]
    pub max_failures: Option<u32>,

    /// Number of workers
    #[arg(short, long)]
    pub workers: Option<i64>,

    /// Queue capacity
    #[arg(short, long)]
    pub queue_capacity: Option<i64>,

    /// Retries allowed per task
    #[arg(short = 'r', long)]
    pub max_retries: Option<u32>,

    /// Seed for jitter and failure injection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Force an immediate stop this many milliseconds after submitting
    #[arg(long, value_name = "MS")]
    pub force_stop_after_ms: Option<u64>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for statistics
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Path to the rp log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retrypool")
        .join("logs")
        .join("rp.log")
}
