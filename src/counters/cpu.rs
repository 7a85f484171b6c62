// Aggregate CPU counters from /proc/stat

use super::parse_u64;
use crate::error::{SampleError, SampleResult};

/// Number of numeric fields required on the aggregate `cpu ` line:
/// user nice system idle iowait irq softirq steal guest guest_nice.
const AGGREGATE_FIELDS: usize = 10;

/// Idle and total jiffies at one instant. `total_ticks >= idle_ticks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuSnapshot {
    pub idle_ticks: u64,
    pub total_ticks: u64,
}

/// System-wide jiffies (every aggregate field summed) plus core count.
/// Denominator for per-process CPU%.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuMeta {
    pub total_jiffies: u64,
    pub num_cpus: u32,
}

/// Idle class is idle + iowait; active class is user + nice + system + irq + softirq + steal.
/// Guest time is already folded into user/nice by the kernel, so it is not added again.
pub fn parse_cpu_snapshot(content: &str, path: &str) -> SampleResult<CpuSnapshot> {
    let f = aggregate_fields(content, path)?;
    let idle = saturating_sum(&f[3..5]);
    let active = saturating_sum(&[f[0], f[1], f[2], f[5], f[6], f[7]]);
    Ok(CpuSnapshot {
        idle_ticks: idle,
        total_ticks: idle.saturating_add(active),
    })
}

pub fn parse_cpu_meta(content: &str, path: &str) -> SampleResult<CpuMeta> {
    let f = aggregate_fields(content, path)?;
    Ok(CpuMeta {
        total_jiffies: saturating_sum(&f),
        num_cpus: count_cores(content),
    })
}

/// Garbage values near `u64::MAX` clamp instead of overflowing.
fn saturating_sum(values: &[u64]) -> u64 {
    values.iter().fold(0u64, |acc, v| acc.saturating_add(*v))
}

/// Count `cpuN` lines; never less than 1.
pub fn count_cores(content: &str) -> u32 {
    let n = content
        .lines()
        .filter(|line| {
            let Some(rest) = line.strip_prefix("cpu") else {
                return false;
            };
            let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
            digits > 0 && rest[digits..].starts_with(char::is_whitespace)
        })
        .count();
    (n as u32).max(1)
}

fn aggregate_fields(content: &str, path: &str) -> SampleResult<[u64; AGGREGATE_FIELDS]> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu "))
        .ok_or_else(|| SampleError::parse(path, "aggregate cpu line not found"))?;

    let parts: Vec<&str> = line.split_whitespace().skip(1).collect();
    if parts.len() < AGGREGATE_FIELDS {
        return Err(SampleError::parse(
            path,
            format!(
                "aggregate cpu line has {} fields, expected {}",
                parts.len(),
                AGGREGATE_FIELDS
            ),
        ));
    }

    let mut fields = [0u64; AGGREGATE_FIELDS];
    for (slot, raw) in fields.iter_mut().zip(&parts) {
        *slot = parse_u64(raw, path, "cpu field")?;
    }
    Ok(fields)
}
