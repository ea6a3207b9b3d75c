//! Delta and rate computation over cumulative kernel counters.
//!
//! Every state struct keeps the previous sample of the entities it tracks,
//! starts empty, and drops entities that vanish from a sample. Counter
//! regressions (reboots, pid reuse, interface resets) never produce a
//! negative value: they read as "no rate" or 0.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::model::{CpuSample, InterfaceRate, NetDevCounters, ProcessRecord};

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Compute u64 delta, returning `None` on counter regression (reset).
pub fn delta_u64(curr: u64, prev: u64) -> Option<u64> {
    curr.checked_sub(prev)
}

/// `delta / secs`, or `None` when no time has passed.
pub fn rate_per_sec(delta: u64, secs: f64) -> Option<f64> {
    (secs > 0.0).then_some(delta as f64 / secs)
}

/// Busy share of the jiffies elapsed between two aggregate samples.
///
/// Idle time is idle + iowait. The result is clamped to 0..=100 and is 0
/// when no jiffies elapsed or the counters went backwards.
pub fn cpu_utilization(prev: &CpuSample, curr: &CpuSample) -> f32 {
    let Some(total_diff) = delta_u64(curr.total(), prev.total()).filter(|d| *d > 0) else {
        return 0.0;
    };
    let idle_diff = delta_u64(curr.idle_total(), prev.idle_total()).unwrap_or(0);
    let busy = total_diff.saturating_sub(idle_diff);
    ((busy as f64 / total_diff as f64) * 100.0).clamp(0.0, 100.0) as f32
}

// ---------------------------------------------------------------------------
// Rate state structs
// ---------------------------------------------------------------------------

/// Aggregate CPU utilization between consecutive polls.
#[derive(Debug, Default)]
pub struct CpuUsageState {
    pub prev_sample: Option<CpuSample>,
}

impl CpuUsageState {
    /// Returns utilization since the previous call; the first call yields 0.
    pub fn update(&mut self, sample: CpuSample) -> f32 {
        let usage = self
            .prev_sample
            .as_ref()
            .map(|prev| cpu_utilization(prev, &sample))
            .unwrap_or(0.0);
        self.prev_sample = Some(sample);
        usage
    }

    pub fn reset(&mut self) {
        self.prev_sample = None;
    }
}

/// Per-process CPU share, keyed by pid.
#[derive(Debug, Default)]
pub struct ProcessCpuState {
    pub prev_ticks: HashMap<u32, u64>,
    pub prev_global_total: Option<u64>,
}

impl ProcessCpuState {
    /// Fills `cpu_usage` of every record and replaces the stored ticks.
    ///
    /// `global_total` is the aggregate jiffy total of the same poll. Usage is
    /// the process tick delta over the global delta, so a process saturating
    /// one of N cores reads 100/N.
    pub fn update(&mut self, records: &mut [ProcessRecord], global_total: u64) {
        let global_diff = self
            .prev_global_total
            .and_then(|prev| delta_u64(global_total, prev))
            .unwrap_or(0);

        let mut seen = HashMap::with_capacity(records.len());
        for record in records.iter_mut() {
            let ticks = record.cpu_ticks();
            record.cpu_usage = match self.prev_ticks.get(&record.pid) {
                Some(prev) if global_diff > 0 => delta_u64(ticks, *prev)
                    .map(|d| (d as f64 / global_diff as f64 * 100.0).min(100.0) as f32)
                    .unwrap_or(0.0),
                _ => 0.0,
            };
            seen.insert(record.pid, ticks);
        }

        self.prev_ticks = seen;
        self.prev_global_total = Some(global_total);
    }

    pub fn tracked(&self) -> usize {
        self.prev_ticks.len()
    }

    pub fn reset(&mut self) {
        self.prev_ticks.clear();
        self.prev_global_total = None;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InterfaceSample {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub ts: DateTime<Utc>,
    /// Set once this sample had a predecessor. Only primed samples serve as
    /// a rate baseline, so the first interval after a cold sample is skipped.
    pub primed: bool,
}

/// Per-interface throughput, keyed by interface name.
#[derive(Debug, Default)]
pub struct InterfaceRateState {
    pub prev_sample: HashMap<String, InterfaceSample>,
}

impl InterfaceRateState {
    /// Returns one rate per counter entry, in input order.
    ///
    /// An interface needs two earlier samples before it gets a rate. A
    /// direction then gets one only when both samples are non-zero, the
    /// counter did not go backwards and time has passed. Interfaces absent
    /// from `counters` are forgotten.
    pub fn update(&mut self, counters: &[NetDevCounters], now: DateTime<Utc>) -> Vec<InterfaceRate> {
        let mut seen = HashMap::with_capacity(counters.len());
        let mut rates = Vec::with_capacity(counters.len());

        for c in counters {
            let mut rate = InterfaceRate {
                interface: c.interface.clone(),
                rx_bytes_per_sec: None,
                tx_bytes_per_sec: None,
            };

            let prev = self.prev_sample.get(&c.interface);
            if let Some(prev) = prev.filter(|p| p.primed) {
                let secs = (now - prev.ts).num_milliseconds() as f64 / 1000.0;
                rate.rx_bytes_per_sec = direction_rate(c.rx_bytes, prev.rx_bytes, secs);
                rate.tx_bytes_per_sec = direction_rate(c.tx_bytes, prev.tx_bytes, secs);
            }

            seen.insert(
                c.interface.clone(),
                InterfaceSample {
                    rx_bytes: c.rx_bytes,
                    tx_bytes: c.tx_bytes,
                    ts: now,
                    primed: prev.is_some(),
                },
            );
            rates.push(rate);
        }

        self.prev_sample = seen;
        rates
    }

    pub fn reset(&mut self) {
        self.prev_sample.clear();
    }
}

fn direction_rate(curr: u64, prev: u64, secs: f64) -> Option<f64> {
    if curr == 0 || prev == 0 {
        return None;
    }
    delta_u64(curr, prev).and_then(|d| rate_per_sec(d, secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cpu(user: u64, system: u64, idle: u64, iowait: u64) -> CpuSample {
        CpuSample {
            user,
            system,
            idle,
            iowait,
            ..Default::default()
        }
    }

    fn proc(pid: u32, utime: u64, stime: u64) -> ProcessRecord {
        ProcessRecord {
            pid,
            utime,
            stime,
            ..Default::default()
        }
    }

    fn dev(name: &str, rx: u64, tx: u64) -> NetDevCounters {
        NetDevCounters {
            interface: name.to_string(),
            rx_bytes: rx,
            tx_bytes: tx,
            ..Default::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_delta_helpers() {
        assert_eq!(delta_u64(10, 4), Some(6));
        assert_eq!(delta_u64(4, 4), Some(0));
        assert_eq!(delta_u64(3, 4), None);
        assert_eq!(rate_per_sec(100, 2.0), Some(50.0));
        assert_eq!(rate_per_sec(100, 0.0), None);
    }

    #[test]
    fn test_cpu_utilization() {
        let prev = cpu(100, 100, 700, 100);
        let curr = cpu(150, 150, 750, 150);
        // total +200, idle (idle+iowait) +100 -> 50%.
        assert!((cpu_utilization(&prev, &curr) - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_cpu_utilization_degenerate() {
        let s = cpu(100, 100, 700, 100);
        assert_eq!(cpu_utilization(&s, &s), 0.0);

        // Counters went backwards (reboot between samples).
        let after_reset = cpu(1, 1, 10, 0);
        assert_eq!(cpu_utilization(&s, &after_reset), 0.0);

        // Idle regressed alone: clamp to 100 rather than exceed it.
        let odd = cpu(300, 200, 600, 100);
        let u = cpu_utilization(&s, &odd);
        assert!((0.0..=100.0).contains(&u));
    }

    #[test]
    fn test_cpu_usage_state_first_sample_is_zero() {
        let mut state = CpuUsageState::default();
        assert_eq!(state.update(cpu(100, 100, 700, 100)), 0.0);
        let u = state.update(cpu(200, 200, 700, 100));
        assert!((u - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_process_cpu_cold_start() {
        let mut state = ProcessCpuState::default();
        let mut records = vec![proc(1, 100, 50)];
        state.update(&mut records, 10_000);
        assert_eq!(records[0].cpu_usage, 0.0);
        assert_eq!(state.tracked(), 1);
    }

    #[test]
    fn test_process_cpu_share_of_global_delta() {
        let mut state = ProcessCpuState::default();
        let mut records = vec![proc(1, 100, 50), proc(2, 0, 0)];
        state.update(&mut records, 10_000);

        let mut records = vec![proc(1, 200, 75), proc(2, 40, 10), proc(3, 500, 0)];
        state.update(&mut records, 10_500);

        assert!((records[0].cpu_usage - 25.0).abs() < 0.001);
        assert!((records[1].cpu_usage - 10.0).abs() < 0.001);
        // New pid: no prior sample.
        assert_eq!(records[2].cpu_usage, 0.0);
    }

    #[test]
    fn test_process_cpu_evicts_vanished_pids() {
        let mut state = ProcessCpuState::default();
        let mut records = vec![proc(1, 10, 0), proc(2, 10, 0)];
        state.update(&mut records, 1_000);
        assert_eq!(state.tracked(), 2);

        let mut records = vec![proc(1, 20, 0)];
        state.update(&mut records, 1_100);
        assert_eq!(state.tracked(), 1);
        assert!(!state.prev_ticks.contains_key(&2));

        // pid 2 comes back (reused): cold start again.
        let mut records = vec![proc(1, 30, 0), proc(2, 5, 0)];
        state.update(&mut records, 1_200);
        assert_eq!(records[1].cpu_usage, 0.0);
    }

    #[test]
    fn test_process_cpu_regressions_are_zero() {
        let mut state = ProcessCpuState::default();
        let mut records = vec![proc(7, 500, 0)];
        state.update(&mut records, 1_000);

        // Tick regression (pid reused between polls).
        let mut records = vec![proc(7, 10, 0)];
        state.update(&mut records, 1_100);
        assert_eq!(records[0].cpu_usage, 0.0);

        // Global total did not move.
        let mut records = vec![proc(7, 20, 0)];
        state.update(&mut records, 1_100);
        assert_eq!(records[0].cpu_usage, 0.0);
    }

    #[test]
    fn test_process_cpu_reused_pid_beside_busy_pid() {
        let mut state = ProcessCpuState::default();
        let mut records = vec![proc(10, 800, 200), proc(11, 100, 0)];
        state.update(&mut records, 5_000);

        // pid 10 was recycled with a fresh counter while pid 11 kept running.
        let mut records = vec![proc(10, 3, 1), proc(11, 150, 0)];
        state.update(&mut records, 5_200);
        assert_eq!(records[0].cpu_usage, 0.0);
        assert!((records[1].cpu_usage - 25.0).abs() < 0.001);
        assert_eq!(state.prev_ticks.get(&10), Some(&4));

        // The recycled pid's new counter is the baseline from here on.
        let mut records = vec![proc(10, 23, 1), proc(11, 150, 0)];
        state.update(&mut records, 5_400);
        assert!((records[0].cpu_usage - 10.0).abs() < 0.001);
        assert_eq!(records[1].cpu_usage, 0.0);
    }

    #[test]
    fn test_interface_rates() {
        let mut state = InterfaceRateState::default();
        let first = state.update(&[dev("eth0", 1_000, 2_000)], t0());
        assert_eq!(first[0].rx_bytes_per_sec, None);
        assert_eq!(first[0].tx_bytes_per_sec, None);

        // The first interval only primes the baseline.
        let second = state.update(&[dev("eth0", 6_000, 4_000)], t0() + Duration::seconds(5));
        assert_eq!(second[0].rx_bytes_per_sec, None);
        assert_eq!(second[0].tx_bytes_per_sec, None);

        let third = state.update(&[dev("eth0", 11_000, 6_000)], t0() + Duration::seconds(10));
        assert_eq!(third[0].rx_bytes_per_sec, Some(1_000.0));
        assert_eq!(third[0].tx_bytes_per_sec, Some(400.0));
    }

    #[test]
    fn test_interface_rate_sequence() {
        let mut state = InterfaceRateState::default();
        let rx: Vec<Option<f64>> = [1_000, 1_000, 2_000]
            .into_iter()
            .enumerate()
            .map(|(i, bytes)| {
                let at = t0() + Duration::seconds(i as i64);
                state.update(&[dev("eth0", bytes, bytes)], at)[0].rx_bytes_per_sec
            })
            .collect();
        assert_eq!(rx, vec![None, None, Some(1_000.0)]);
    }

    #[test]
    fn test_interface_rate_reset_and_zero() {
        let mut state = InterfaceRateState::default();
        state.update(&[dev("eth0", 5_000, 0)], t0());

        let rates = state.update(&[dev("eth0", 100, 300)], t0() + Duration::seconds(1));
        // rx went backwards, tx was zero before.
        assert_eq!(rates[0].rx_bytes_per_sec, None);
        assert_eq!(rates[0].tx_bytes_per_sec, None);

        let rates = state.update(&[dev("eth0", 300, 600)], t0() + Duration::seconds(2));
        assert_eq!(rates[0].rx_bytes_per_sec, Some(200.0));
        assert_eq!(rates[0].tx_bytes_per_sec, Some(300.0));
    }

    #[test]
    fn test_interface_rate_needs_elapsed_time() {
        let mut state = InterfaceRateState::default();
        state.update(&[dev("eth0", 100, 100)], t0());
        state.update(&[dev("eth0", 150, 150)], t0() + Duration::seconds(1));
        let rates = state.update(&[dev("eth0", 200, 200)], t0() + Duration::seconds(1));
        assert_eq!(rates[0].rx_bytes_per_sec, None);
    }

    #[test]
    fn test_interface_eviction() {
        let mut state = InterfaceRateState::default();
        state.update(&[dev("eth0", 100, 100), dev("wg0", 100, 100)], t0());
        state.update(&[dev("eth0", 200, 200)], t0() + Duration::seconds(1));
        assert_eq!(state.prev_sample.len(), 1);

        // wg0 reappears: treated as new.
        let rates = state.update(
            &[dev("eth0", 300, 300), dev("wg0", 900, 900)],
            t0() + Duration::seconds(2),
        );
        assert_eq!(rates[1].rx_bytes_per_sec, None);
    }
}
