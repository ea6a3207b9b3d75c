//! Cooperative per-domain refresh scheduling.
//!
//! Each metric domain has its own cadence. The scheduler only tracks
//! deadlines; the caller decides when to ask and what to run.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// A group of metrics refreshed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Domain {
    /// CPU utilization, temperature and fan.
    Cpu,
    Processes,
    Memory,
    Disks,
    Interfaces,
    Connections,
    Ports,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Cpu,
        Domain::Processes,
        Domain::Memory,
        Domain::Disks,
        Domain::Interfaces,
        Domain::Connections,
        Domain::Ports,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            Domain::Cpu => "cpu",
            Domain::Processes => "processes",
            Domain::Memory => "memory",
            Domain::Disks => "disks",
            Domain::Interfaces => "interfaces",
            Domain::Connections => "connections",
            Domain::Ports => "ports",
        }
    }
}

pub const MIN_FPS: f32 = 1.0;
pub const MAX_FPS: f32 = 60.0;

/// Sampler settings. `Default` matches a desktop monitor refreshing the CPU
/// graph at 30 fps.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub proc_path: String,
    pub sys_path: String,
    /// CPU/thermal/fan samples per second, clamped to 1..=60.
    pub fps: f32,
    pub process_interval: Duration,
    pub memory_interval: Duration,
    pub disk_interval: Duration,
    pub interface_interval: Duration,
    pub connection_interval: Duration,
    pub port_interval: Duration,
    pub history_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            proc_path: "/proc".to_string(),
            sys_path: "/sys".to_string(),
            fps: 30.0,
            process_interval: Duration::from_secs(1),
            memory_interval: Duration::from_secs(1),
            disk_interval: Duration::from_secs(5),
            interface_interval: Duration::from_secs(5),
            connection_interval: Duration::from_secs(3),
            port_interval: Duration::from_secs(5),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl SamplerConfig {
    pub fn period(&self, domain: Domain) -> Duration {
        match domain {
            Domain::Cpu => {
                let fps = if self.fps.is_finite() {
                    self.fps.clamp(MIN_FPS, MAX_FPS)
                } else {
                    MIN_FPS
                };
                Duration::from_secs_f64(1.0 / f64::from(fps))
            }
            Domain::Processes => self.process_interval,
            Domain::Memory => self.memory_interval,
            Domain::Disks => self.disk_interval,
            Domain::Interfaces => self.interface_interval,
            Domain::Connections => self.connection_interval,
            Domain::Ports => self.port_interval,
        }
    }
}

/// Per-domain deadlines.
///
/// A domain with no deadline is due on the next `due` call; every domain
/// starts that way.
#[derive(Debug, Clone)]
pub struct Scheduler {
    periods: [Duration; Domain::ALL.len()],
    next_due: [Option<Instant>; Domain::ALL.len()],
}

impl Scheduler {
    pub fn new(config: &SamplerConfig) -> Self {
        Self {
            periods: Domain::ALL.map(|d| config.period(d)),
            next_due: [None; Domain::ALL.len()],
        }
    }

    pub fn period(&self, domain: Domain) -> Duration {
        self.periods[domain.index()]
    }

    /// Domains whose deadline has passed, in `Domain::ALL` order.
    ///
    /// Each returned domain is rescheduled one period after `now`, so a
    /// late caller gets one refresh rather than a burst of catch-ups.
    pub fn due(&mut self, now: Instant) -> Vec<Domain> {
        let mut due = Vec::new();
        for domain in Domain::ALL {
            let idx = domain.index();
            if self.next_due[idx].is_none_or(|deadline| deadline <= now) {
                self.next_due[idx] = Some(now + self.periods[idx]);
                due.push(domain);
            }
        }
        due
    }

    /// Makes `domain` due on the next `due` call.
    pub fn force(&mut self, domain: Domain) {
        self.next_due[domain.index()] = None;
    }

    pub fn force_all(&mut self) {
        self.next_due = [None; Domain::ALL.len()];
    }

    /// Earliest pending deadline, or `None` when something is already due.
    pub fn next_deadline(&self) -> Option<Instant> {
        let mut earliest: Option<Instant> = None;
        for deadline in self.next_due {
            let deadline = deadline?;
            earliest = Some(earliest.map_or(deadline, |e| e.min(deadline)));
        }
        earliest
    }

    /// Time to sleep from `now` until something is due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_deadline()
            .map(|d| d.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SamplerConfig {
        SamplerConfig {
            fps: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_everything_due_at_start() {
        let mut s = Scheduler::new(&config());
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.due(Instant::now()), Domain::ALL.to_vec());
    }

    #[test]
    fn test_due_once_per_period() {
        let mut s = Scheduler::new(&config());
        let t0 = Instant::now();
        s.due(t0);

        assert!(s.due(t0).is_empty());
        assert!(s.due(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(s.due(t0 + Duration::from_millis(100)), vec![Domain::Cpu]);

        let at_1s = t0 + Duration::from_secs(1);
        assert_eq!(
            s.due(at_1s),
            vec![Domain::Cpu, Domain::Processes, Domain::Memory]
        );
        assert_eq!(s.due(at_1s), vec![]);

        let at_3s = t0 + Duration::from_secs(3);
        assert_eq!(
            s.due(at_3s),
            vec![Domain::Cpu, Domain::Processes, Domain::Memory, Domain::Connections]
        );
    }

    #[test]
    fn test_late_poll_does_not_burst() {
        let mut s = Scheduler::new(&config());
        let t0 = Instant::now();
        s.due(t0);

        // Ten CPU periods late: one refresh, next one a period later.
        let late = t0 + Duration::from_secs(1);
        assert!(s.due(late).contains(&Domain::Cpu));
        assert!(!s.due(late + Duration::from_millis(99)).contains(&Domain::Cpu));
    }

    #[test]
    fn test_force() {
        let mut s = Scheduler::new(&config());
        let t0 = Instant::now();
        s.due(t0);
        assert!(s.next_deadline().is_some());

        s.force(Domain::Disks);
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.due(t0), vec![Domain::Disks]);
        assert_eq!(s.next_deadline(), Some(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_time_until_due() {
        let mut s = Scheduler::new(&config());
        let t0 = Instant::now();
        assert_eq!(s.time_until_due(t0), Duration::ZERO);
        s.due(t0);
        assert_eq!(s.time_until_due(t0), Duration::from_millis(100));
        assert_eq!(s.time_until_due(t0 + Duration::from_secs(9)), Duration::ZERO);
    }

    #[test]
    fn test_fps_is_clamped() {
        let mut cfg = config();
        cfg.fps = 500.0;
        assert_eq!(cfg.period(Domain::Cpu), Duration::from_secs_f64(1.0 / 60.0));
        cfg.fps = 0.0;
        assert_eq!(cfg.period(Domain::Cpu), Duration::from_secs(1));
        cfg.fps = f32::NAN;
        assert_eq!(cfg.period(Domain::Cpu), Duration::from_secs(1));
    }

    #[test]
    fn test_default_cadences() {
        let cfg = SamplerConfig::default();
        assert_eq!(cfg.period(Domain::Processes), Duration::from_secs(1));
        assert_eq!(cfg.period(Domain::Connections), Duration::from_secs(3));
        assert_eq!(cfg.period(Domain::Ports), Duration::from_secs(5));
        assert_eq!(cfg.history_capacity, 100);
    }
}
