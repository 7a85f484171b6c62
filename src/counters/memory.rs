// /proc/meminfo: `Key:   value kB` lines, scaled to bytes

use std::collections::HashMap;

use super::parse_u64;
use crate::error::{SampleError, SampleResult};
use crate::models::MemoryInfo;

pub fn parse_meminfo(content: &str, path: &str) -> SampleResult<MemoryInfo> {
    let mut kb: HashMap<&str, u64> = HashMap::new();
    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest.split_whitespace().next() else {
            continue;
        };
        kb.insert(key.trim(), parse_u64(value, path, key.trim())?);
    }

    let required = |key: &str| {
        kb.get(key)
            .copied()
            .ok_or_else(|| SampleError::parse(path, format!("{key} not found")))
    };
    let optional = |key: &str| kb.get(key).copied().unwrap_or(0);

    let total = required("MemTotal")? * 1024;
    let free = required("MemFree")? * 1024;
    let swap_total = optional("SwapTotal") * 1024;
    let swap_free = optional("SwapFree") * 1024;

    Ok(MemoryInfo {
        total,
        free,
        available: optional("MemAvailable") * 1024,
        used: total.saturating_sub(free),
        buffers: optional("Buffers") * 1024,
        cached: optional("Cached") * 1024,
        swap_total,
        swap_used: swap_total.saturating_sub(swap_free),
    })
}
