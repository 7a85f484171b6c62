// Rate engine: previous-sample state per metric stream and delta-over-time math.
// Each stream is behind its own mutex so overlapping cycles serialize their
// read-modify-write of the previous sample.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::counters::{CpuMeta, CpuSnapshot, DiskSnapshot, ProcessSnapshot};
use crate::models::{DiskRate, ProcessEntry, round_to};

/// Bytes per sector assumed for /proc/diskstats counters.
pub const DEFAULT_SECTOR_SIZE: u64 = 512;

/// Previous sample of one stream and when it was taken.
#[derive(Debug, Clone)]
pub struct RateState<K> {
    previous: K,
    taken_at: Instant,
}

impl<K> RateState<K> {
    fn new(previous: K, taken_at: Instant) -> Self {
        Self { previous, taken_at }
    }

    /// Replace the stored sample unless it was taken after `taken_at`. A read that
    /// started earlier but reached the lock later must not roll the stream back.
    fn advance(slot: &mut Option<Self>, current: K, taken_at: Instant) {
        if slot.as_ref().is_some_and(|state| state.taken_at > taken_at) {
            tracing::debug!("stale sample, baseline kept");
            return;
        }
        *slot = Some(Self::new(current, taken_at));
    }

    /// Seconds between the stored sample and `now`; 0 if `now` is not later.
    fn elapsed_secs(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.taken_at).as_secs_f64()
    }
}

/// Per-process stream: system jiffies and the ticks of every process alive at the last read.
#[derive(Debug, Clone, Default)]
struct ProcessTicks {
    total_jiffies: u64,
    ticks: HashMap<u32, u64>,
}

pub struct RateEngine {
    sector_size: u64,
    cpu: Mutex<Option<RateState<CpuSnapshot>>>,
    disk: Mutex<Option<RateState<Vec<DiskSnapshot>>>>,
    process: Mutex<Option<RateState<ProcessTicks>>>,
}

impl Default for RateEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SECTOR_SIZE)
    }
}

impl RateEngine {
    pub fn new(sector_size: u64) -> Self {
        Self {
            sector_size,
            cpu: Mutex::new(None),
            disk: Mutex::new(None),
            process: Mutex::new(None),
        }
    }

    /// Cross-cycle CPU%: compares against the snapshot from the previous call.
    /// `None` on the bootstrap call or when no ticks elapsed.
    pub fn observe_cpu(&self, current: CpuSnapshot, now: Instant) -> Option<f64> {
        let mut guard = lock(&self.cpu);
        let usage = guard
            .as_ref()
            .filter(|state| state.taken_at <= now)
            .and_then(|state| cpu_usage_percent(&state.previous, &current));
        RateState::advance(&mut guard, current, now);
        usage
    }

    /// Disk throughput since the previous call, sorted by total throughput descending.
    /// Empty on the bootstrap call and when no time elapsed.
    pub fn disk_rates(&self, current: Vec<DiskSnapshot>, now: Instant) -> Vec<DiskRate> {
        let mut guard = lock(&self.disk);
        let rates = match guard.as_ref() {
            None => Vec::new(),
            Some(state) => {
                let elapsed = state.elapsed_secs(now);
                if elapsed > 0.0 {
                    compute_disk_rates(&state.previous, &current, elapsed, self.sector_size)
                } else {
                    tracing::debug!(operation = "disk_rates", "zero interval, no rates");
                    Vec::new()
                }
            }
        };
        RateState::advance(&mut guard, current, now);
        rates
    }

    /// Attach CPU% to each live process and retain ticks only for those processes.
    ///
    /// On the bootstrap call every process reports 0. Afterwards a process not seen
    /// last time is measured against 0 ticks, so its first sample reflects its whole
    /// lifetime CPU time.
    pub fn process_cpu(
        &self,
        meta: CpuMeta,
        processes: Vec<ProcessSnapshot>,
        now: Instant,
    ) -> Vec<ProcessEntry> {
        let mut guard = lock(&self.process);
        let previous = guard
            .as_ref()
            .filter(|state| state.taken_at <= now)
            .map(|state| &state.previous);
        let delta_total =
            previous.map(|prev| meta.total_jiffies.saturating_sub(prev.total_jiffies));

        let mut next = ProcessTicks {
            total_jiffies: meta.total_jiffies,
            ticks: HashMap::with_capacity(processes.len()),
        };

        let entries = processes
            .into_iter()
            .map(|p| {
                let cpu_percent = match (previous, delta_total) {
                    (Some(prev), Some(delta_total)) => {
                        let prev_ticks = prev.ticks.get(&p.pid).copied().unwrap_or(0);
                        process_cpu_percent(
                            p.cpu_ticks.saturating_sub(prev_ticks),
                            delta_total,
                            meta.num_cpus,
                        )
                    }
                    _ => 0.0,
                };
                next.ticks.insert(p.pid, p.cpu_ticks);
                ProcessEntry {
                    pid: p.pid,
                    name: p.name,
                    uid: p.uid,
                    rss: p.rss_bytes,
                    cpu_percent: round_to(cpu_percent, 1),
                }
            })
            .collect();

        RateState::advance(&mut guard, next, now);
        entries
    }
}

/// `(Δtotal − Δidle) / Δtotal × 100`. `None` if total ticks did not advance
/// (zero interval or a counter reset).
pub fn cpu_usage_percent(previous: &CpuSnapshot, current: &CpuSnapshot) -> Option<f64> {
    let delta_total = current.total_ticks.checked_sub(previous.total_ticks)?;
    if delta_total == 0 {
        return None;
    }
    let delta_idle = current.idle_ticks.saturating_sub(previous.idle_ticks);
    let busy = delta_total.saturating_sub(delta_idle);
    Some(busy as f64 / delta_total as f64 * 100.0)
}

/// `Δprocess / Δsystem × 100 × cpus`; 0 when the system counter did not advance.
pub fn process_cpu_percent(delta_process: u64, delta_total: u64, num_cpus: u32) -> f64 {
    if delta_total == 0 {
        return 0.0;
    }
    delta_process as f64 / delta_total as f64 * 100.0 * num_cpus.max(1) as f64
}

/// Devices keep discovery order within equal throughput. A device without a previous
/// sample reports 0; counters that went backwards (device reset) floor at 0.
pub fn compute_disk_rates(
    previous: &[DiskSnapshot],
    current: &[DiskSnapshot],
    elapsed_secs: f64,
    sector_size: u64,
) -> Vec<DiskRate> {
    let per_sec = |delta_sectors: u64| (delta_sectors * sector_size) as f64 / elapsed_secs;

    let mut rates: Vec<DiskRate> = current
        .iter()
        .map(|cur| {
            let prev = previous
                .iter()
                .find(|p| p.device_name == cur.device_name)
                .unwrap_or(cur);
            DiskRate {
                name: cur.device_name.clone(),
                reads_per_sec_bytes: per_sec(cur.sectors_read.saturating_sub(prev.sectors_read)),
                writes_per_sec_bytes: per_sec(
                    cur.sectors_written.saturating_sub(prev.sectors_written),
                ),
            }
        })
        .collect();

    rates.sort_by(|a, b| b.total().total_cmp(&a.total()));
    rates
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cpu(idle: u64, total: u64) -> CpuSnapshot {
        CpuSnapshot {
            idle_ticks: idle,
            total_ticks: total,
        }
    }

    fn disk(name: &str, read: u64, written: u64) -> DiskSnapshot {
        DiskSnapshot {
            device_name: name.to_string(),
            sectors_read: read,
            sectors_written: written,
        }
    }

    fn proc_snap(pid: u32, ticks: u64, rss: u64) -> ProcessSnapshot {
        ProcessSnapshot {
            pid,
            name: format!("p{pid}"),
            uid: "1000".to_string(),
            cpu_ticks: ticks,
            rss_bytes: rss,
        }
    }

    fn meta(total: u64, cpus: u32) -> CpuMeta {
        CpuMeta {
            total_jiffies: total,
            num_cpus: cpus,
        }
    }

    #[test]
    fn cpu_usage_scenario() {
        let usage = cpu_usage_percent(&cpu(100, 200), &cpu(120, 250)).unwrap();
        assert_eq!(round_to(usage, 2), 60.0);
    }

    #[test]
    fn cpu_usage_all_idle_is_zero() {
        assert_eq!(cpu_usage_percent(&cpu(100, 200), &cpu(150, 250)), Some(0.0));
    }

    #[test]
    fn cpu_usage_zero_delta_is_none() {
        assert_eq!(cpu_usage_percent(&cpu(100, 200), &cpu(100, 200)), None);
        assert_eq!(cpu_usage_percent(&cpu(100, 200), &cpu(90, 150)), None);
    }

    #[test]
    fn cpu_usage_stays_within_bounds() {
        for delta_total in 1..60u64 {
            for delta_idle in 0..=delta_total {
                let prev = cpu(1_000, 5_000);
                let cur = cpu(1_000 + delta_idle, 5_000 + delta_total);
                let usage = cpu_usage_percent(&prev, &cur).unwrap();
                assert!((0.0..=100.0 + 1e-9).contains(&usage), "usage {usage}");
            }
        }
    }

    #[test]
    fn observe_cpu_bootstraps_then_reports() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        assert_eq!(engine.observe_cpu(cpu(100, 200), t0), None);
        let usage = engine
            .observe_cpu(cpu(120, 250), t0 + Duration::from_secs(1))
            .unwrap();
        assert_eq!(round_to(usage, 2), 60.0);
    }

    #[test]
    fn stale_cpu_sample_keeps_newer_baseline() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.observe_cpu(cpu(100, 200), t0 + Duration::from_secs(1));
        // read started before the stored one but reached the engine later
        assert_eq!(engine.observe_cpu(cpu(90, 150), t0), None);
        let usage = engine
            .observe_cpu(cpu(120, 250), t0 + Duration::from_secs(2))
            .unwrap();
        assert_eq!(round_to(usage, 2), 60.0);
    }

    #[test]
    fn stale_disk_sample_keeps_newer_baseline() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.disk_rates(vec![disk("sda", 1_000, 1_000)], t0 + Duration::from_secs(1));
        assert!(engine.disk_rates(vec![disk("sda", 900, 900)], t0).is_empty());
        let rates = engine.disk_rates(
            vec![disk("sda", 1_100, 1_000)],
            t0 + Duration::from_secs(2),
        );
        assert_eq!(rates[0].reads_per_sec_bytes, 100.0 * 512.0);
    }

    #[test]
    fn stale_process_sample_reports_zero_and_keeps_baseline() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.process_cpu(meta(1_000, 1), vec![proc_snap(1, 100, 0)], t0 + Duration::from_secs(1));
        let stale = engine.process_cpu(meta(900, 1), vec![proc_snap(1, 90, 0)], t0);
        assert!(stale.iter().all(|e| e.cpu_percent == 0.0));
        let entries = engine.process_cpu(
            meta(2_000, 1),
            vec![proc_snap(1, 200, 0)],
            t0 + Duration::from_secs(2),
        );
        assert_eq!(entries[0].cpu_percent, 10.0);
    }

    #[test]
    fn disk_first_call_is_empty() {
        let engine = RateEngine::default();
        let rates = engine.disk_rates(vec![disk("sda", 10, 10)], Instant::now());
        assert!(rates.is_empty());
    }

    #[test]
    fn disk_rates_scale_sectors_by_elapsed_time() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.disk_rates(vec![disk("sda", 1_000, 2_000)], t0);
        let rates = engine.disk_rates(
            vec![disk("sda", 1_400, 2_100)],
            t0 + Duration::from_secs(2),
        );
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].reads_per_sec_bytes, 400.0 * 512.0 / 2.0);
        assert_eq!(rates[0].writes_per_sec_bytes, 100.0 * 512.0 / 2.0);
    }

    #[test]
    fn disk_zero_interval_yields_no_rates() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.disk_rates(vec![disk("sda", 0, 0)], t0);
        assert!(engine.disk_rates(vec![disk("sda", 50, 50)], t0).is_empty());
    }

    #[test]
    fn disk_counter_reset_floors_at_zero() {
        let rates = compute_disk_rates(&[disk("sdb", 900, 900)], &[disk("sdb", 10, 20)], 1.0, 512);
        assert_eq!(rates[0].reads_per_sec_bytes, 0.0);
        assert_eq!(rates[0].writes_per_sec_bytes, 0.0);
    }

    #[test]
    fn disk_new_device_reports_zero() {
        let rates = compute_disk_rates(&[], &[disk("sdc", 500, 500)], 1.0, 512);
        assert_eq!(rates[0].total(), 0.0);
    }

    #[test]
    fn disk_sorted_by_throughput_with_stable_ties() {
        let prev = vec![disk("a", 0, 0), disk("b", 0, 0), disk("c", 0, 0), disk("d", 0, 0)];
        let cur = vec![disk("a", 1, 1), disk("b", 10, 0), disk("c", 2, 0), disk("d", 0, 10)];
        let names: Vec<String> = compute_disk_rates(&prev, &cur, 1.0, 512)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn disk_rates_are_idempotent_for_fixed_inputs() {
        let prev = vec![disk("sda", 100, 100)];
        let cur = vec![disk("sda", 300, 700)];
        assert_eq!(
            compute_disk_rates(&prev, &cur, 3.0, 512),
            compute_disk_rates(&prev, &cur, 3.0, 512)
        );
    }

    #[test]
    fn process_first_call_reports_zero() {
        let engine = RateEngine::default();
        let entries = engine.process_cpu(
            meta(10_000, 4),
            vec![proc_snap(1, 500, 10), proc_snap(2, 900, 20)],
            Instant::now(),
        );
        assert!(entries.iter().all(|e| e.cpu_percent == 0.0));
    }

    #[test]
    fn process_cpu_scales_by_core_count() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.process_cpu(meta(10_000, 4), vec![proc_snap(1, 500, 10)], t0);
        let entries = engine.process_cpu(
            meta(10_400, 4),
            vec![proc_snap(1, 600, 10)],
            t0 + Duration::from_secs(1),
        );
        // 100 / 400 * 100 * 4
        assert_eq!(entries[0].cpu_percent, 100.0);
    }

    #[test]
    fn process_newly_seen_measures_against_zero() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.process_cpu(meta(1_000, 1), vec![proc_snap(1, 10, 0)], t0);
        let entries = engine.process_cpu(
            meta(2_000, 1),
            vec![proc_snap(1, 10, 0), proc_snap(9, 50, 0)],
            t0 + Duration::from_secs(1),
        );
        let newcomer = entries.iter().find(|e| e.pid == 9).unwrap();
        assert_eq!(newcomer.cpu_percent, 5.0);
    }

    #[test]
    fn vanished_process_ticks_are_not_retained() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.process_cpu(
            meta(1_000, 1),
            vec![proc_snap(1, 0, 0), proc_snap(7, 100, 0)],
            t0,
        );
        let second = engine.process_cpu(
            meta(2_000, 1),
            vec![proc_snap(1, 0, 0)],
            t0 + Duration::from_secs(1),
        );
        assert!(second.iter().all(|e| e.pid != 7));

        // pid 7 returns: measured from 0 again, not from its old 100 ticks
        let third = engine.process_cpu(
            meta(3_000, 1),
            vec![proc_snap(1, 0, 0), proc_snap(7, 110, 0)],
            t0 + Duration::from_secs(2),
        );
        let seven = third.iter().find(|e| e.pid == 7).unwrap();
        assert_eq!(seven.cpu_percent, 11.0);
    }

    #[test]
    fn process_zero_system_delta_reports_zero() {
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.process_cpu(meta(1_000, 2), vec![proc_snap(1, 10, 0)], t0);
        let entries = engine.process_cpu(meta(1_000, 2), vec![proc_snap(1, 20, 0)], t0);
        assert_eq!(entries[0].cpu_percent, 0.0);
    }

    #[test]
    fn process_ticks_going_backwards_floor_at_zero() {
        assert_eq!(process_cpu_percent(0, 100, 2), 0.0);
        let engine = RateEngine::default();
        let t0 = Instant::now();
        engine.process_cpu(meta(1_000, 1), vec![proc_snap(3, 500, 0)], t0);
        let entries = engine.process_cpu(meta(1_100, 1), vec![proc_snap(3, 20, 0)], t0);
        assert_eq!(entries[0].cpu_percent, 0.0);
    }
}
