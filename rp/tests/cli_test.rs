//! Smoke tests for the rp binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// rp command isolated from the user's config and log directories
fn rp(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("rp").expect("rp binary should build");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"));
    cmd
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    rp(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_prints_normalized_pool() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("pool.yml"),
        "pool:\n  worker-count: 3\n  queue-capacity: 9\n  min-backoff-ms: 10\n  backoff-jitter: 4.0\n",
    )
    .unwrap();

    rp(&home)
        .args(["--config", "pool.yml", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("worker-count: 3"))
        .stdout(predicate::str::contains("min-backoff-ms: 1000"))
        .stdout(predicate::str::contains("backoff-jitter: 0.2"));
}

#[test]
fn test_config_rejects_zero_workers() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".retrypool.yml"), "pool:\n  worker-count: 0\n").unwrap();

    rp(&home)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Worker count must be greater than zero"));
}

#[test]
fn test_run_without_failures_reports_json() {
    let home = TempDir::new().unwrap();
    rp(&home)
        .args([
            "run",
            "--tasks",
            "12",
            "--fail-rate",
            "0",
            "--workers",
            "3",
            "--queue-capacity",
            "4",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"submitted\": 12"))
        .stdout(predicate::str::contains("\"succeeded\": 12"))
        .stdout(predicate::str::contains("\"given_up\": 0"));
}

#[test]
fn test_run_failures_without_retry_give_up() {
    let home = TempDir::new().unwrap();
    rp(&home)
        .args([
            "run",
            "--tasks",
            "5",
            "--fail-rate",
            "1",
            "--max-failures",
            "1",
            "--max-retries",
            "0",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"succeeded\": 0"))
        .stdout(predicate::str::contains("\"given_up\": 5"));
}
