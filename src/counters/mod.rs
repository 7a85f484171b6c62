// Pure parsers for kernel counter text (/proc/stat, /proc/diskstats, /proc/<pid>/*, meminfo, uptime).
// No I/O here: procfs_repo reads the files and hands the content over.

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod process;
pub mod summary;

pub use cpu::{CpuMeta, CpuSnapshot, count_cores, parse_cpu_meta, parse_cpu_snapshot};
pub use disk::{DiskSnapshot, parse_diskstats};
pub use memory::parse_meminfo;
pub use process::{ProcessSnapshot, parse_pid_stat, parse_pid_status};
pub use summary::{format_uptime, parse_loadavg, parse_uptime};

use crate::error::{SampleError, SampleResult};

/// Parse one whitespace-separated unsigned counter field.
pub(crate) fn parse_u64(field: &str, path: &str, what: &str) -> SampleResult<u64> {
    field
        .parse::<u64>()
        .map_err(|_| SampleError::parse(path, format!("{what}: expected integer, got '{field}'")))
}
