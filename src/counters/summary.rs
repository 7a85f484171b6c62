// /proc/uptime and /proc/loadavg single-line records

use crate::error::{SampleError, SampleResult};
use crate::models::LoadAverage;

const SECS_PER_DAY: u64 = 24 * 3600;

/// `<uptime-seconds> <idle-seconds>`; only the first field is used.
pub fn parse_uptime(content: &str, path: &str) -> SampleResult<f64> {
    let first = content
        .split_whitespace()
        .next()
        .ok_or_else(|| SampleError::parse(path, "empty uptime record"))?;
    parse_f64(first, path)
}

/// `<1m> <5m> <15m> <running/total> <last-pid>`.
pub fn parse_loadavg(content: &str, path: &str) -> SampleResult<LoadAverage> {
    let fields: Vec<&str> = content.split_whitespace().take(3).collect();
    let [one, five, fifteen] = fields[..] else {
        return Err(SampleError::parse(
            path,
            format!("expected 3 load averages, got {}", fields.len()),
        ));
    };
    Ok(LoadAverage {
        one: parse_f64(one, path)?,
        five: parse_f64(five, path)?,
        fifteen: parse_f64(fifteen, path)?,
    })
}

/// Largest nonzero unit first: `1d 3h 5m`, `2h 0m`, `5m`.
pub fn format_uptime(seconds: f64) -> String {
    let secs = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let days = secs / SECS_PER_DAY;
    let hours = (secs % SECS_PER_DAY) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

fn parse_f64(field: &str, path: &str) -> SampleResult<f64> {
    field
        .parse::<f64>()
        .map_err(|_| SampleError::parse(path, format!("expected number, got '{field}'")))
}
