use serde::Deserialize;
use std::path::PathBuf;

use crate::rate_engine::DEFAULT_SECTOR_SIZE;

/// Below this the two-read CPU window is dominated by jiffy quantization.
const MIN_CPU_WINDOW_MS: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    pub publishing: PublishingConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    /// Root of the kernel counter tree; tests point this at a fake tree.
    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
    /// Delay between the two reads of the single-shot CPU measurement.
    #[serde(default = "default_cpu_window_ms")]
    pub cpu_window_ms: u64,
    /// Upper bound on any single counter file read.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Max per-process reads in flight.
    #[serde(default = "default_read_concurrency")]
    pub read_concurrency: usize,
    #[serde(default = "default_top_processes")]
    pub top_processes: usize,
    #[serde(default = "default_sector_size")]
    pub sector_size: u64,
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_cpu_window_ms() -> u64 {
    200
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_read_concurrency() -> usize {
    64
}

fn default_top_processes() -> usize {
    100
}

fn default_sector_size() -> u64 {
    DEFAULT_SECTOR_SIZE
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            proc_root: default_proc_root(),
            cpu_window_ms: default_cpu_window_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            read_concurrency: default_read_concurrency(),
            top_processes: default_top_processes(),
            sector_size: default_sector_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    /// Max number of snapshots kept in the broadcast channel for /ws/system (slow clients may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub sample_interval_ms: u64,
    /// How often to log app stats (ws_system clients, cycles completed) at INFO level.
    pub stats_log_interval_secs: u64,
    /// Number of recent CPU/memory points kept in memory for GET /api/history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_capacity() -> usize {
    60
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.sampling.proc_root.as_os_str().is_empty(),
            "sampling.proc_root must be non-empty"
        );
        anyhow::ensure!(
            self.sampling.cpu_window_ms >= MIN_CPU_WINDOW_MS,
            "sampling.cpu_window_ms must be >= {}, got {}",
            MIN_CPU_WINDOW_MS,
            self.sampling.cpu_window_ms
        );
        anyhow::ensure!(
            self.sampling.read_timeout_ms > 0,
            "sampling.read_timeout_ms must be > 0, got {}",
            self.sampling.read_timeout_ms
        );
        anyhow::ensure!(
            self.sampling.read_concurrency > 0,
            "sampling.read_concurrency must be > 0, got {}",
            self.sampling.read_concurrency
        );
        anyhow::ensure!(
            self.sampling.top_processes > 0,
            "sampling.top_processes must be > 0, got {}",
            self.sampling.top_processes
        );
        anyhow::ensure!(
            self.sampling.sector_size > 0,
            "sampling.sector_size must be > 0, got {}",
            self.sampling.sector_size
        );
        anyhow::ensure!(
            self.publishing.broadcast_capacity > 0,
            "publishing.broadcast_capacity must be > 0, got {}",
            self.publishing.broadcast_capacity
        );
        anyhow::ensure!(
            self.monitoring.sample_interval_ms > 0,
            "monitoring.sample_interval_ms must be > 0, got {}",
            self.monitoring.sample_interval_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        anyhow::ensure!(
            self.monitoring.history_capacity > 0,
            "monitoring.history_capacity must be > 0, got {}",
            self.monitoring.history_capacity
        );
        Ok(())
    }
}
