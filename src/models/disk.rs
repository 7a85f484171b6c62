use serde::{Deserialize, Serialize};

/// Throughput assumes a fixed sector size (512 bytes unless configured otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskRate {
    pub name: String,
    pub reads_per_sec_bytes: f64,
    pub writes_per_sec_bytes: f64,
}

impl DiskRate {
    pub fn total(&self) -> f64 {
        self.reads_per_sec_bytes + self.writes_per_sec_bytes
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskStats {
    pub devices: Vec<DiskRate>,
}
