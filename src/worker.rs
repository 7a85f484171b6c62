// Background poller: samples every metric stream at a fixed cadence, records
// CPU/memory into the history ring and broadcasts the snapshot to /ws/system.

use crate::error::SampleResult;
use crate::history::MetricHistory;
use crate::models::FullSnapshot;
use crate::procfs_repo::ProcfsRepo;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, interval};
use tracing::Instrument;

/// Rate limit for "no receivers" message (avoid logging every cycle when no one is on /ws/system)
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Repos, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub procfs_repo: Arc<ProcfsRepo>,
    pub history: Arc<MetricHistory>,
    pub tx: broadcast::Sender<FullSnapshot>,
    pub ws_system_connections: Arc<AtomicUsize>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    pub sample_interval_ms: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                operation = "get_timestamp",
                "system time error"
            );
            0
        })
}

/// A failed stream only blanks its own metric for this cycle.
fn ok_or_warn<T>(result: SampleResult<T>, operation: &'static str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, operation, "metric unavailable this cycle");
            None
        }
    }
}

/// One poller cycle. CPU is measured against the previous cycle, not a fresh window.
pub async fn collect_snapshot(repo: &ProcfsRepo) -> FullSnapshot {
    let timestamp = now_millis();
    FullSnapshot {
        timestamp,
        cpu: ok_or_warn(repo.sample_cpu_usage().await, "sample_cpu_usage"),
        memory: ok_or_warn(repo.get_memory_info().await, "get_memory_info"),
        disk: ok_or_warn(repo.get_disk_stats().await, "get_disk_stats"),
        summary: ok_or_warn(repo.get_summary().await, "get_summary"),
        processes: ok_or_warn(repo.get_processes().await, "get_processes"),
    }
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        procfs_repo,
        history,
        tx,
        ws_system_connections,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_ms,
        stats_log_interval_secs,
    } = config;

    let stats_log_interval = Duration::from_secs(stats_log_interval_secs);
    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", sample_interval_ms);

    let run = async move {
        let mut tick = interval(Duration::from_millis(sample_interval_ms));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut cycles_total: u64 = 0;
        let mut last_no_receivers_warn: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let snapshot = collect_snapshot(&procfs_repo).await;
                    history.record(&snapshot);
                    cycles_total += 1;

                    if tx.send(snapshot).is_err() {
                        let should_warn = last_no_receivers_warn
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                        if should_warn {
                            tracing::debug!(
                                operation = "broadcast_snapshot",
                                "No active WebSocket clients; broadcast channel has no receivers"
                            );
                            last_no_receivers_warn = Some(Instant::now());
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ws_system_clients =
                            ws_system_connections.load(std::sync::atomic::Ordering::Relaxed),
                        cycles_total,
                        history_points = history.len(),
                        "app stats"
                    );
                }
            }
        }
    };
    tokio::spawn(run.instrument(worker_span))
}
