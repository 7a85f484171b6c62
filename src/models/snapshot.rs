// Per-cycle poller output and history ring points

use serde::{Deserialize, Serialize};

use super::{CpuUsage, DiskStats, MemoryInfo, ProcessEntry, SummaryInfo};

/// One poller cycle. A metric whose read failed this cycle is `None` (null on the wire);
/// the others are unaffected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSnapshot {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub cpu: Option<CpuUsage>,
    pub memory: Option<MemoryInfo>,
    pub disk: Option<DiskStats>,
    pub summary: Option<SummaryInfo>,
    pub processes: Option<Vec<ProcessEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub timestamp: u64,
    pub cpu_percent: Option<f64>,
    pub memory_used: Option<u64>,
    pub memory_total: Option<u64>,
}

impl HistoryPoint {
    pub fn from_snapshot(snapshot: &FullSnapshot) -> Self {
        HistoryPoint {
            timestamp: snapshot.timestamp,
            cpu_percent: snapshot.cpu.map(|c| c.overall),
            memory_used: snapshot.memory.as_ref().map(|m| m.used),
            memory_total: snapshot.memory.as_ref().map(|m| m.total),
        }
    }
}
