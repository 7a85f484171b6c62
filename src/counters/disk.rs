// Per-device sector counters from /proc/diskstats

use super::parse_u64;
use crate::error::SampleResult;

/// Lines with fewer fields are not device records and are skipped.
const MIN_FIELDS: usize = 14;

/// Pseudo-devices never reported.
const EXCLUDED_PREFIXES: [&str; 2] = ["loop", "ram"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskSnapshot {
    pub device_name: String,
    pub sectors_read: u64,
    pub sectors_written: u64,
}

/// Parse every device line, in file (discovery) order.
/// Field 3 is the device name, field 6 sectors read, field 10 sectors written.
pub fn parse_diskstats(content: &str, path: &str) -> SampleResult<Vec<DiskSnapshot>> {
    let mut devices = Vec::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < MIN_FIELDS {
            continue;
        }
        let name = parts[2];
        if is_excluded(name) {
            continue;
        }
        devices.push(DiskSnapshot {
            device_name: name.to_string(),
            sectors_read: parse_u64(parts[5], path, "sectors read")?,
            sectors_written: parse_u64(parts[9], path, "sectors written")?,
        });
    }
    Ok(devices)
}

pub fn is_excluded(device_name: &str) -> bool {
    EXCLUDED_PREFIXES
        .iter()
        .any(|prefix| device_name.starts_with(prefix))
}
