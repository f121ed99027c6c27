//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the process-backed converter and its worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directory holding ffmpeg/ffprobe; overrides `FFMPEG_HOME`.
    #[serde(default)]
    pub ffmpeg_home: Option<PathBuf>,

    /// Install directory probed relative to the working directory.
    #[serde(default = "default_local_tools_dir")]
    pub local_tools_dir: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional ffmpeg arguments placed before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// Maximum parallel conversions; derived from the CPU count when unset.
    #[serde(default)]
    pub max_parallel_conversions: Option<usize>,

    /// Per-job timeout in seconds. No timeout when unset.
    #[serde(default)]
    pub job_timeout_secs: Option<u64>,
}

fn default_local_tools_dir() -> PathBuf {
    PathBuf::from("ffmpeg").join("bin")
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_home: None,
            local_tools_dir: default_local_tools_dir(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
            max_parallel_conversions: None,
            job_timeout_secs: None,
        }
    }
}

impl ConverterConfig {
    /// Sets the override tools directory.
    pub fn with_ffmpeg_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.ffmpeg_home = Some(home.into());
        self
    }

    /// Sets the local relative tools directory.
    pub fn with_local_tools_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.local_tools_dir = dir.into();
        self
    }

    /// Sets the maximum parallel conversions.
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel_conversions = Some(max);
        self
    }

    /// Sets the per-job timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.job_timeout_secs = Some(timeout_secs);
        self
    }

    /// Number of workers the pool should run.
    pub fn worker_count(&self) -> usize {
        self.max_parallel_conversions
            .unwrap_or_else(default_worker_count)
            .max(1)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}

/// `max(2, available_parallelism / 2)`.
pub fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus / 2).max(2)
}

/// Configuration for the simulated converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Progress ticks emitted per job.
    #[serde(default = "default_steps")]
    pub steps: u32,

    /// Delay before each tick in milliseconds.
    #[serde(default = "default_step_delay")]
    pub step_delay_ms: u64,
}

fn default_steps() -> u32 {
    20
}

fn default_step_delay() -> u64 {
    60
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            step_delay_ms: default_step_delay(),
        }
    }
}

impl SimulationConfig {
    /// A configuration with no delay between ticks.
    pub fn instant(steps: u32) -> Self {
        Self {
            steps,
            step_delay_ms: 0,
        }
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConverterConfig::default();
        assert_eq!(config.ffmpeg_home, None);
        assert_eq!(config.local_tools_dir, PathBuf::from("ffmpeg/bin"));
        assert_eq!(config.ffmpeg_log_level, "error");
        assert_eq!(config.job_timeout(), None);
    }

    #[test]
    fn test_config_builder() {
        let config = ConverterConfig::default()
            .with_ffmpeg_home("/opt/ffmpeg")
            .with_local_tools_dir("tools")
            .with_max_parallel(8)
            .with_timeout(600);

        assert_eq!(config.ffmpeg_home, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(config.local_tools_dir, PathBuf::from("tools"));
        assert_eq!(config.worker_count(), 8);
        assert_eq!(config.job_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_default_worker_count_is_at_least_two() {
        assert!(default_worker_count() >= 2);
        assert_eq!(ConverterConfig::default().worker_count(), default_worker_count());
    }

    #[test]
    fn test_simulation_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.steps, 20);
        assert_eq!(config.step_delay(), Duration::from_millis(60));
        assert_eq!(SimulationConfig::instant(5).step_delay_ms, 0);
    }

    #[test]
    fn test_config_serialization() {
        let config = ConverterConfig::default().with_max_parallel(3);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ConverterConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
