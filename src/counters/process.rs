// Per-process counters from /proc/<pid>/stat and /proc/<pid>/status

use super::parse_u64;
use crate::error::{SampleError, SampleResult};

/// Index of utime among the fields following the `(comm)` field; stime follows it.
const UTIME_AFTER_COMM: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub uid: String,
    /// utime + stime, cumulative since process start.
    pub cpu_ticks: u64,
    pub rss_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidStat {
    pub comm: String,
    pub cpu_ticks: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidStatus {
    pub name: Option<String>,
    pub uid: String,
    pub rss_kb: u64,
}

impl ProcessSnapshot {
    /// Prefers the status `Name:`; falls back to the stat comm.
    pub fn from_parts(pid: u32, stat: PidStat, status: PidStatus) -> Self {
        ProcessSnapshot {
            pid,
            name: status.name.unwrap_or(stat.comm),
            uid: status.uid,
            cpu_ticks: stat.cpu_ticks,
            rss_bytes: status.rss_kb * 1024,
        }
    }
}

/// The comm field may itself contain spaces or parentheses, so it is taken
/// as everything between the first `(` and the last `)`.
pub fn parse_pid_stat(content: &str, path: &str) -> SampleResult<PidStat> {
    let open = content
        .find('(')
        .ok_or_else(|| SampleError::parse(path, "missing '(' before comm"))?;
    let close = content
        .rfind(')')
        .filter(|&c| c > open)
        .ok_or_else(|| SampleError::parse(path, "missing ')' after comm"))?;
    let comm = content[open + 1..close].to_string();

    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() <= UTIME_AFTER_COMM + 1 {
        return Err(SampleError::parse(
            path,
            format!("stat record too short ({} fields after comm)", rest.len()),
        ));
    }
    let utime = parse_u64(rest[UTIME_AFTER_COMM], path, "utime")?;
    let stime = parse_u64(rest[UTIME_AFTER_COMM + 1], path, "stime")?;

    Ok(PidStat {
        comm,
        cpu_ticks: utime.saturating_add(stime),
    })
}

/// Picks `Name`, the real `Uid` and `VmRSS` (kB). Kernel threads have no
/// VmRSS line and report 0.
pub fn parse_pid_status(content: &str) -> PidStatus {
    let mut status = PidStatus::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key {
            "Name" => {
                let name = value.trim();
                if !name.is_empty() {
                    status.name = Some(name.to_string());
                }
            }
            "Uid" => {
                status.uid = value.split_whitespace().next().unwrap_or_default().to_string();
            }
            "VmRSS" => {
                status.rss_kb = value
                    .split_whitespace()
                    .next()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
            }
            _ => {}
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "4242 (tokio-runtime (w)) S 1 4242 4242 0 -1 4194560 2201 0 3 0 150 45 0 0 20 0 9 0 8841 1133219840 4001 18446744073709551615\n";

    const STATUS: &str = "Name:\tpostgres\nUmask:\t0022\nState:\tS (sleeping)\nUid:\t999\t999\t999\t999\nGid:\t999\t999\t999\t999\nVmRSS:\t   20480 kB\nThreads:\t1\n";

    #[test]
    fn stat_sums_utime_and_stime() {
        let stat = parse_pid_stat(STAT, "4242/stat").unwrap();
        assert_eq!(stat.cpu_ticks, 195);
        assert_eq!(stat.comm, "tokio-runtime (w)");
    }

    #[test]
    fn stat_without_comm_is_parse_error() {
        assert!(parse_pid_stat("4242 S 1 2 3", "4242/stat").is_err());
    }

    #[test]
    fn truncated_stat_is_parse_error() {
        let err = parse_pid_stat("4242 (sh) S 1 2 3", "4242/stat").unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn status_extracts_name_uid_and_rss() {
        let status = parse_pid_status(STATUS);
        assert_eq!(status.name.as_deref(), Some("postgres"));
        assert_eq!(status.uid, "999");
        assert_eq!(status.rss_kb, 20480);
    }

    #[test]
    fn snapshot_prefers_status_name_and_converts_rss() {
        let stat = parse_pid_stat(STAT, "4242/stat").unwrap();
        let snap = ProcessSnapshot::from_parts(4242, stat, parse_pid_status(STATUS));
        assert_eq!(snap.name, "postgres");
        assert_eq!(snap.rss_bytes, 20480 * 1024);
    }

    #[test]
    fn snapshot_falls_back_to_comm_for_kernel_threads() {
        let stat = parse_pid_stat(
            "2 (kthreadd) S 0 0 0 0 -1 2129984 0 0 0 0 0 7 0 0 20 0 1 0 2 0 0\n",
            "2/stat",
        )
        .unwrap();
        let snap = ProcessSnapshot::from_parts(2, stat, parse_pid_status("Name:\t\nUid:\t0\t0\t0\t0\n"));
        assert_eq!(snap.name, "kthreadd");
        assert_eq!(snap.uid, "0");
        assert_eq!(snap.rss_bytes, 0);
        assert_eq!(snap.cpu_ticks, 7);
    }

    #[test]
    fn huge_utime_and_stime_saturate() {
        let line = format!(
            "7 (spin) R 1 7 7 0 -1 0 0 0 0 0 {m} {m} 0 0 20 0 1 0 2 0 0\n",
            m = u64::MAX
        );
        let stat = parse_pid_stat(&line, "7/stat").unwrap();
        assert_eq!(stat.cpu_ticks, u64::MAX);
    }
}
