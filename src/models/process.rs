use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    pub uid: String,
    /// Resident set size in bytes.
    pub rss: u64,
    /// Rounded to 1 decimal place. Not clamped: a multi-threaded process can exceed 100.
    pub cpu_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessList {
    pub processes: Vec<ProcessEntry>,
}
