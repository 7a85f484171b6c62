// Counter reads over a procfs root, feeding the rate engine

mod processes;

pub use processes::rank_processes;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::instrument;

use crate::config::SamplingConfig;
use crate::counters::{
    CpuSnapshot, format_uptime, parse_cpu_snapshot, parse_diskstats, parse_loadavg,
    parse_meminfo, parse_uptime,
};
use crate::error::{SampleError, SampleResult};
use crate::models::{CpuUsage, DiskStats, MemoryInfo, SummaryInfo, round_to};
use crate::rate_engine::{RateEngine, cpu_usage_percent};

/// Content of one counter file plus the path it came from (for error context).
struct Counter {
    path: String,
    text: String,
}

pub struct ProcfsRepo {
    root: PathBuf,
    engine: RateEngine,
    cpu_window: Duration,
    read_timeout: Duration,
    read_concurrency: usize,
    top_processes: usize,
}

impl Default for ProcfsRepo {
    fn default() -> Self {
        Self::new(&SamplingConfig::default())
    }
}

impl ProcfsRepo {
    pub fn new(config: &SamplingConfig) -> Self {
        Self {
            root: config.proc_root.clone(),
            engine: RateEngine::new(config.sector_size),
            cpu_window: Duration::from_millis(config.cpu_window_ms),
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            read_concurrency: config.read_concurrency.max(1),
            top_processes: config.top_processes,
        }
    }

    /// Read a file under the root, bounded by `read_timeout`. Invalid UTF-8 (process
    /// names can hold arbitrary bytes) is replaced rather than failing the read.
    async fn read_counter(&self, relative: impl AsRef<Path>) -> SampleResult<Counter> {
        let full = self.root.join(relative);
        let path = full.display().to_string();
        match tokio::time::timeout(self.read_timeout, tokio::fs::read(&full)).await {
            Ok(Ok(bytes)) => Ok(Counter {
                path,
                text: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            Ok(Err(source)) => Err(SampleError::SourceUnavailable { path, source }),
            Err(_) => Err(SampleError::Timeout { path }),
        }
    }

    pub async fn read_cpu_snapshot(&self) -> SampleResult<CpuSnapshot> {
        let stat = self.read_counter("stat").await?;
        parse_cpu_snapshot(&stat.text, &stat.path)
    }

    /// Single-shot CPU%: two reads `cpu_window` apart. No ticks elapsed reads as 0.
    #[instrument(skip(self), fields(repo = "procfs", operation = "get_cpu_usage"))]
    pub async fn get_cpu_usage(&self) -> SampleResult<CpuUsage> {
        let first = self.read_cpu_snapshot().await?;
        tokio::time::sleep(self.cpu_window).await;
        let second = self.read_cpu_snapshot().await?;

        let overall = cpu_usage_percent(&first, &second).unwrap_or_else(|| {
            tracing::debug!("no CPU ticks elapsed in sampling window");
            0.0
        });
        Ok(CpuUsage {
            overall: round_to(overall, 2),
        })
    }

    /// Cross-cycle CPU% against the previous call. The bootstrap call reads as 0.
    #[instrument(skip(self), fields(repo = "procfs", operation = "sample_cpu_usage"))]
    pub async fn sample_cpu_usage(&self) -> SampleResult<CpuUsage> {
        let taken_at = Instant::now();
        let snapshot = self.read_cpu_snapshot().await?;
        let overall = self
            .engine
            .observe_cpu(snapshot, taken_at)
            .unwrap_or(0.0);
        Ok(CpuUsage {
            overall: round_to(overall, 2),
        })
    }

    #[instrument(skip(self), fields(repo = "procfs", operation = "get_memory_info"))]
    pub async fn get_memory_info(&self) -> SampleResult<MemoryInfo> {
        let meminfo = self.read_counter("meminfo").await?;
        parse_meminfo(&meminfo.text, &meminfo.path)
    }

    /// Disk throughput since the previous call; the bootstrap call has no devices.
    #[instrument(skip(self), fields(repo = "procfs", operation = "get_disk_stats"))]
    pub async fn get_disk_stats(&self) -> SampleResult<DiskStats> {
        let taken_at = Instant::now();
        let diskstats = self.read_counter("diskstats").await?;
        let current = parse_diskstats(&diskstats.text, &diskstats.path)?;
        let devices = self.engine.disk_rates(current, taken_at);
        Ok(DiskStats { devices })
    }

    #[instrument(skip(self), fields(repo = "procfs", operation = "get_summary"))]
    pub async fn get_summary(&self) -> SampleResult<SummaryInfo> {
        let (uptime, loadavg) =
            tokio::try_join!(self.read_counter("uptime"), self.read_counter("loadavg"))?;
        let uptime_seconds = parse_uptime(&uptime.text, &uptime.path)?;
        let loadavg = parse_loadavg(&loadavg.text, &loadavg.path)?;
        Ok(SummaryInfo {
            uptime_seconds,
            uptime_human: format_uptime(uptime_seconds),
            loadavg,
        })
    }
}
