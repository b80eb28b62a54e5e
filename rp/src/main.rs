//! rp - retrypool demonstration binary
//!
//! Drives a pool with a synthetic flaky workload and reports what happened.

use std::fs;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use retrypool::cli::{Cli, Command, OutputFormat, RunArgs, get_log_path};
use retrypool::config::Config;
use retrypool::{PoolStats, demo};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Run(args) => cmd_run(config, args).await,
        Command::Config => cmd_config(&config),
    }
}

/// Run the synthetic workload and print the pool statistics
async fn cmd_run(mut config: Config, args: RunArgs) -> Result<()> {
    if let Some(tasks) = args.tasks {
        config.demo.tasks = tasks;
    }
    if let Some(fail_rate) = args.fail_rate {
        config.demo.fail_rate = fail_rate;
    }
    if let Some(max_failures) = args.max_failures {
        config.demo.max_failures = max_failures;
    }
    if let Some(workers) = args.workers {
        config.pool.worker_count = workers;
    }
    if let Some(capacity) = args.queue_capacity {
        config.pool.queue_capacity = capacity;
    }
    if let Some(max_retries) = args.max_retries {
        config.pool.max_retry_count = max_retries;
    }
    if args.seed.is_some() {
        config.pool.seed = args.seed;
    }

    info!(pool = ?config.pool, demo = ?config.demo, "cmd_run: starting workload");
    let force_stop_after = args.force_stop_after_ms.map(Duration::from_millis);
    let stats = demo::run(config.pool, &config.demo, force_stop_after).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => print_stats(&stats),
    }
    Ok(())
}

/// Print the effective pool configuration as YAML
fn cmd_config(config: &Config) -> Result<()> {
    config.pool.validate()?;
    let pool = config.pool.normalized();
    print!("{}", serde_yaml::to_string(&pool).context("Failed to render config")?);
    Ok(())
}

fn print_stats(stats: &PoolStats) {
    println!("{}", "Pool statistics".bold());
    println!("  submitted:        {}", stats.submitted);
    println!("  succeeded:        {}", stats.succeeded.to_string().green());
    println!("  retried:          {}", stats.retried.to_string().yellow());
    println!("  given up:         {}", stats.given_up.to_string().red());
    println!("  abandoned:        {}", stats.abandoned.to_string().red());
    println!("  rejected:         {}", stats.rejected);
    println!("  peak retry waits: {}", stats.peak_retry_waits);
}
