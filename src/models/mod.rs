// Output models consumed by the transport layer (camelCase JSON)

mod cpu;
mod disk;
mod memory;
mod process;
mod snapshot;
mod summary;

pub use cpu::CpuUsage;
pub use disk::{DiskRate, DiskStats};
pub use memory::MemoryInfo;
pub use process::{ProcessEntry, ProcessList};
pub use snapshot::{FullSnapshot, HistoryPoint};
pub use summary::{LoadAverage, SummaryInfo};

/// Round to `dp` decimal places for output.
pub fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}
