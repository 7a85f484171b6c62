// Process enumeration: list numeric entries under the root, read each one
// concurrently, drop the ones that vanished, attach CPU% from the engine.

use futures_util::stream::{self, StreamExt};
use std::time::Instant;
use tracing::instrument;

use super::ProcfsRepo;
use crate::counters::{ProcessSnapshot, parse_cpu_meta, parse_pid_stat, parse_pid_status};
use crate::error::{EphemeralProcess, SampleError, SampleResult};
use crate::models::ProcessEntry;

impl ProcfsRepo {
    /// Top processes by CPU% (then RSS), at most `top_processes` entries.
    #[instrument(skip(self), fields(repo = "procfs", operation = "get_processes"))]
    pub async fn get_processes(&self) -> SampleResult<Vec<ProcessEntry>> {
        let taken_at = Instant::now();
        let stat = self.read_counter("stat").await?;
        let meta = parse_cpu_meta(&stat.text, &stat.path)?;

        let pids = self.list_pids().await?;
        let listed = pids.len();
        let snapshots = self.read_processes(pids).await;
        tracing::debug!(listed, alive = snapshots.len(), "processes read");

        let entries = self.engine.process_cpu(meta, snapshots, taken_at);
        Ok(rank_processes(entries, self.top_processes))
    }

    /// Numeric directory names under the root, in directory order.
    pub async fn list_pids(&self) -> SampleResult<Vec<u32>> {
        let path = self.root.display().to_string();
        let unavailable = |source: std::io::Error| SampleError::SourceUnavailable {
            path: path.clone(),
            source,
        };

        let mut dir = tokio::fs::read_dir(&self.root).await.map_err(unavailable)?;
        let mut pids = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(unavailable)? {
            let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };
            // the entry can disappear between listing and stat
            if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                pids.push(pid);
            }
        }
        Ok(pids)
    }

    /// Fan out per-process reads with bounded concurrency; results come back in
    /// listing order regardless of completion order.
    async fn read_processes(&self, pids: Vec<u32>) -> Vec<ProcessSnapshot> {
        stream::iter(pids)
            .map(|pid| self.read_process(pid))
            .buffered(self.read_concurrency)
            .filter_map(|result| {
                std::future::ready(match result {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        tracing::trace!(pid = e.pid, "{}", e);
                        None
                    }
                })
            })
            .collect()
            .await
    }

    /// Any failure here means the process exited (or is unreadable) and is reported
    /// as ephemeral rather than as a source error.
    pub async fn read_process(&self, pid: u32) -> Result<ProcessSnapshot, EphemeralProcess> {
        let dir = pid.to_string();
        let ephemeral = |e: SampleError| {
            tracing::trace!(pid, error = %e, "process read failed");
            EphemeralProcess { pid }
        };

        let (stat, status) = tokio::try_join!(
            self.read_counter(format!("{dir}/stat")),
            self.read_counter(format!("{dir}/status")),
        )
        .map_err(ephemeral)?;
        let stat = parse_pid_stat(&stat.text, &stat.path).map_err(ephemeral)?;

        Ok(ProcessSnapshot::from_parts(
            pid,
            stat,
            parse_pid_status(&status.text),
        ))
    }
}

/// CPU% descending, ties by RSS descending, truncated to `top_n`.
pub fn rank_processes(mut entries: Vec<ProcessEntry>, top_n: usize) -> Vec<ProcessEntry> {
    entries.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then_with(|| b.rss.cmp(&a.rss))
    });
    entries.truncate(top_n);
    entries
}
