//! rp configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::pool::PoolConfig;

/// Main rp configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pool settings
    pub pool: PoolConfig,

    /// Synthetic workload settings
    pub demo: DemoConfig,
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must load. Otherwise the first readable candidate
    /// wins: `.retrypool.yml` in the working directory, then
    /// `retrypool/retrypool.yml` under the user config directory. With
    /// neither, defaults apply.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).with_context(|| format!("Failed to load config from {}", path.display()));
        }

        let found = Self::candidates()
            .into_iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::load_from_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Config::load: skipping unreadable config");
                    None
                }
            });

        Ok(found.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        }))
    }

    /// Implicit config locations, most specific first
    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".retrypool.yml")];
        paths.extend(dirs::config_dir().map(|dir| dir.join("retrypool").join("retrypool.yml")));
        paths
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!(path = %path.as_ref().display(), "Loaded config");
        Ok(config)
    }
}

/// Synthetic workload for `rp run`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of tasks to submit
    pub tasks: usize,

    /// Probability that a single run fails
    #[serde(rename = "fail-rate")]
    pub fail_rate: f64,

    /// Upper bound on failures per task; once reached the task succeeds
    #[serde(rename = "max-failures")]
    pub max_failures: u32,

    /// Simulated work per run in milliseconds
    #[serde(rename = "task-duration-ms")]
    pub task_duration_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            tasks: 20,
            fail_rate: 0.3,
            max_failures: 2,
            task_duration_ms: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pool, PoolConfig::default());
        assert_eq!(config.demo.tasks, 20);
        assert_eq!(config.demo.max_failures, 2);
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
pool:
  worker-count: 8
  queue-capacity: 32
  max-retry-count: 4
  backoff-multiplier: 2.0

demo:
  tasks: 100
  fail-rate: 0.5
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.pool.worker_count, 8);
        assert_eq!(config.pool.queue_capacity, 32);
        assert_eq!(config.pool.max_retry_count, 4);
        assert_eq!(config.pool.backoff_multiplier, 2.0);
        assert_eq!(config.demo.tasks, 100);
        assert_eq!(config.demo.fail_rate, 0.5);

        // Defaults for unspecified
        assert_eq!(config.pool.backoff_jitter, 0.2);
        assert_eq!(config.demo.task_duration_ms, 50);
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pool:\n  worker-count: 3\n  queue-capacity: 6").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.pool.worker_count, 3);
        assert_eq!(config.pool.queue_capacity, 6);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_candidates_local_first() {
        let candidates = Config::candidates();
        assert_eq!(candidates[0], PathBuf::from(".retrypool.yml"));
        if let Some(user) = candidates.get(1) {
            assert!(user.ends_with("retrypool/retrypool.yml"));
        }
    }
}
