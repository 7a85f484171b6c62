// Shared test helpers: a fake procfs tree in a temp dir

#![allow(dead_code)]

use procpulse::config::SamplingConfig;
use procpulse::procfs_repo::ProcfsRepo;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MEMINFO: &str = "MemTotal:        1000 kB\n\
MemFree:          400 kB\n\
MemAvailable:     700 kB\n\
Buffers:           50 kB\n\
Cached:           100 kB\n\
SwapTotal:        200 kB\n\
SwapFree:         150 kB\n";

pub const DISKSTATS: &str = "   7       0 loop0 57 0 2104 12 0 0 0 0 0 32 12 0 0 0 0\n\
   8       0 sda 100 0 1000 0 100 0 1000 0 0 0 0 0 0 0 0\n\
   8      16 sdb 100 0 5000 0 100 0 5000 0 0 0 0 0 0 0 0\n";

pub struct FakeProc {
    dir: TempDir,
}

impl FakeProc {
    /// Tree with static stat, meminfo, diskstats, uptime and loadavg; no processes.
    pub fn new() -> Self {
        let fake = FakeProc {
            dir: TempDir::new().expect("tempdir"),
        };
        fake.set_cpu([100, 0, 0, 100, 0, 0, 0, 0, 0, 0], 2);
        fake.write("meminfo", MEMINFO);
        fake.write("diskstats", DISKSTATS);
        fake.write("uptime", "90000.00 170000.00\n");
        fake.write("loadavg", "0.50 0.75 1.25 2/311 4242\n");
        fake
    }

    /// Empty root: every counter source is missing.
    pub fn empty() -> Self {
        FakeProc {
            dir: TempDir::new().expect("tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) {
        self.write_bytes(relative, content.as_bytes());
    }

    /// Raw content, for counter files that are not valid UTF-8.
    pub fn write_bytes(&self, relative: &str, content: &[u8]) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn remove(&self, relative: &str) {
        let path = self.dir.path().join(relative);
        if path.is_dir() {
            std::fs::remove_dir_all(path).unwrap();
        } else {
            std::fs::remove_file(path).unwrap();
        }
    }

    /// Aggregate line from the 10 fields plus `cores` per-core lines.
    pub fn set_cpu(&self, fields: [u64; 10], cores: usize) {
        let aggregate = fields
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let mut text = format!("cpu  {aggregate}\n");
        for core in 0..cores {
            text.push_str(&format!("cpu{core} 0 0 0 0 0 0 0 0 0 0\n"));
        }
        text.push_str("intr 100 0 0\nctxt 2000\nbtime 1700000000\nprocesses 500\n");
        self.write("stat", &text);
    }

    pub fn add_process(&self, pid: u32, name: &str, uid: u32, utime: u64, stime: u64, rss_kb: u64) {
        self.write(
            &format!("{pid}/stat"),
            &format!(
                "{pid} ({name}) S 1 {pid} {pid} 0 -1 4194304 120 0 0 0 {utime} {stime} 0 0 20 0 1 0 100 10485760 {} 18446744073709551615\n",
                rss_kb / 4
            ),
        );
        self.write(
            &format!("{pid}/status"),
            &format!(
                "Name:\t{name}\nUmask:\t0022\nState:\tS (sleeping)\nUid:\t{uid}\t{uid}\t{uid}\t{uid}\nVmRSS:\t{rss_kb:>8} kB\n"
            ),
        );
    }

    pub fn config(&self) -> SamplingConfig {
        SamplingConfig {
            proc_root: PathBuf::from(self.root()),
            cpu_window_ms: 20,
            ..SamplingConfig::default()
        }
    }

    pub fn repo(&self) -> ProcfsRepo {
        ProcfsRepo::new(&self.config())
    }
}
