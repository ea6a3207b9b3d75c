//! Owns the collectors and delta state and turns due domains into a report.
//!
//! ```text
//!   Scheduler::due(now) ──► [Domain] ──► Sampler::refresh ──► HostReport
//!                                            │
//!          ┌─────────────┬──────────────┬────┴─────────┬──────────────┐
//!   SystemCollector  ProcessCollector  DiskCollector  NetworkCollector  SensorCollector
//!          └─────────────┴──────────────┴──────┬───────┴──────────────┘
//!                                     FileSystem / HostApi
//! ```
//!
//! A failing source never aborts a poll: the affected metric falls back to a
//! zeroed or empty value and the remaining domains still run.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::alerts::{AlertEvent, AlertRegistry};
use crate::collector::disks::DiskCollector;
use crate::collector::network::NetworkCollector;
use crate::collector::procfs::{ProcessCollector, ProcessTree, SystemCollector};
use crate::collector::sensors::SensorCollector;
use crate::collector::traits::{FileSystem, HostApi};
use crate::history::SampleRing;
use crate::model::{
    ConnectionRecord, DiskRecord, HostInfo, InterfaceKind, InterfaceRate, ListeningPort,
    LoadAverage, MemoryRecord, NetworkInterfaceRecord, ProcessCounts, ProcessRecord, SensorRecord,
};
use crate::rates::{CpuUsageState, InterfaceRateState, ProcessCpuState};
use crate::scheduler::{Domain, SamplerConfig, Scheduler};

/// One row of the flattened process tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub depth: usize,
    pub pid: u32,
}

/// Latest value of every metric. Domains that were not due keep the value
/// from their last refresh.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HostReport {
    pub timestamp: Option<DateTime<Utc>>,
    pub host: HostInfo,
    /// Aggregate CPU utilization percent. 0 until two samples exist.
    pub cpu_usage: f32,
    /// `None` until the first CPU refresh.
    pub sensors: Option<SensorRecord>,
    pub processes: Vec<ProcessRecord>,
    pub process_counts: ProcessCounts,
    pub process_tree: Vec<TreeRow>,
    pub memory: MemoryRecord,
    pub loadavg: LoadAverage,
    pub uptime_secs: f64,
    pub disks: Vec<DiskRecord>,
    pub interfaces: Vec<NetworkInterfaceRecord>,
    pub interface_rates: Vec<InterfaceRate>,
    pub connections: Vec<ConnectionRecord>,
    pub listening_ports: Vec<ListeningPort>,
    /// Alert crossings raised by the most recent process refresh.
    pub alert_events: Vec<AlertEvent>,
}

/// Rolling series for charts.
#[derive(Debug, Clone)]
pub struct Histories {
    pub cpu_usage: SampleRing,
    pub temperature: SampleRing,
    pub fan_speed: SampleRing,
    /// Sum over non-loopback interfaces, bytes per second.
    pub rx_rate: SampleRing,
    pub tx_rate: SampleRing,
}

impl Histories {
    fn new(cap: usize) -> Self {
        Self {
            cpu_usage: SampleRing::new(cap),
            temperature: SampleRing::new(cap),
            fan_speed: SampleRing::new(cap),
            rx_rate: SampleRing::new(cap),
            tx_rate: SampleRing::new(cap),
        }
    }

    fn rings_mut(&mut self) -> [&mut SampleRing; 5] {
        [
            &mut self.cpu_usage,
            &mut self.temperature,
            &mut self.fan_speed,
            &mut self.rx_rate,
            &mut self.tx_rate,
        ]
    }

    pub fn pause(&mut self) {
        for ring in self.rings_mut() {
            ring.pause();
        }
    }

    pub fn resume(&mut self) {
        for ring in self.rings_mut() {
            ring.resume();
        }
    }
}

pub struct Sampler<F: FileSystem + Clone, H: HostApi + Clone> {
    config: SamplerConfig,
    scheduler: Scheduler,
    system: SystemCollector<F>,
    processes: ProcessCollector<F>,
    disks: DiskCollector<F, H>,
    network: NetworkCollector<F, H>,
    sensors: SensorCollector<F>,
    cpu_state: CpuUsageState,
    process_cpu_state: ProcessCpuState,
    interface_state: InterfaceRateState,
    alerts: AlertRegistry,
    histories: Histories,
    report: HostReport,
}

impl<F: FileSystem + Clone, H: HostApi + Clone> Sampler<F, H> {
    pub fn new(fs: F, host: H, config: SamplerConfig) -> Self {
        let proc_path = config.proc_path.clone();
        let sys_path = config.sys_path.clone();
        let system = SystemCollector::new(fs.clone(), proc_path.clone());
        let report = HostReport {
            host: system.collect_host_info(),
            ..Default::default()
        };

        Self {
            scheduler: Scheduler::new(&config),
            histories: Histories::new(config.history_capacity),
            processes: ProcessCollector::new(fs.clone(), proc_path.clone()),
            disks: DiskCollector::new(fs.clone(), host.clone(), proc_path.clone()),
            network: NetworkCollector::new(fs.clone(), host, proc_path, sys_path.clone()),
            sensors: SensorCollector::new(fs, sys_path),
            system,
            cpu_state: CpuUsageState::default(),
            process_cpu_state: ProcessCpuState::default(),
            interface_state: InterfaceRateState::default(),
            alerts: AlertRegistry::new(),
            report,
            config,
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn report(&self) -> &HostReport {
        &self.report
    }

    pub fn histories(&self) -> &Histories {
        &self.histories
    }

    pub fn histories_mut(&mut self) -> &mut Histories {
        &mut self.histories
    }

    pub fn alerts(&self) -> &AlertRegistry {
        &self.alerts
    }

    pub fn alerts_mut(&mut self) -> &mut AlertRegistry {
        &mut self.alerts
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Makes `domain` refresh on the next poll.
    pub fn force(&mut self, domain: Domain) {
        self.scheduler.force(domain);
    }

    /// Refreshes every due domain and returns which ones ran.
    pub fn poll(&mut self, now: Instant) -> Vec<Domain> {
        self.poll_at(now, Utc::now())
    }

    /// `poll` with an explicit wall-clock timestamp for rate calculations.
    pub fn poll_at(&mut self, now: Instant, wall: DateTime<Utc>) -> Vec<Domain> {
        let due = self.scheduler.due(now);
        if due.is_empty() {
            return due;
        }

        // The alert list only describes the poll that produced it.
        self.report.alert_events.clear();
        for domain in &due {
            self.refresh(*domain, wall);
        }
        self.report.timestamp = Some(wall);
        due
    }

    fn refresh(&mut self, domain: Domain, wall: DateTime<Utc>) {
        match domain {
            Domain::Cpu => self.refresh_cpu(),
            Domain::Processes => self.refresh_processes(),
            Domain::Memory => self.refresh_memory(),
            Domain::Disks => self.report.disks = self.disks.collect_disks(),
            Domain::Interfaces => self.refresh_interfaces(wall),
            Domain::Connections => self.report.connections = self.network.collect_connections(),
            Domain::Ports => self.report.listening_ports = self.network.collect_listening_ports(),
        }
    }

    fn refresh_cpu(&mut self) {
        self.report.cpu_usage = match self.system.collect_cpu_sample() {
            Ok(sample) => self.cpu_state.update(sample),
            Err(e) => {
                debug!(error = %e, "cpu sample unavailable");
                0.0
            }
        };

        let sensors = self.sensors.collect();
        self.histories.cpu_usage.push(self.report.cpu_usage);
        self.histories.temperature.push(sensors.temperature_c);
        self.histories.fan_speed.push(sensors.fan.speed_rpm.value as f32);
        self.report.sensors = Some(sensors);
    }

    fn refresh_processes(&mut self) {
        let mut records = match self.processes.collect_all_processes() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "process enumeration failed");
                Vec::new()
            }
        };

        // The per-process share needs the global jiffy delta over the same
        // interval, so the aggregate counters are read alongside.
        match self.system.collect_cpu_sample() {
            Ok(sample) => self.process_cpu_state.update(&mut records, sample.total()),
            Err(e) => debug!(error = %e, "process cpu shares skipped"),
        }

        let tree = ProcessTree::build(&records);
        self.report.process_tree = tree
            .walk()
            .into_iter()
            .map(|(depth, pid)| TreeRow { depth, pid })
            .collect();
        self.report.process_counts = ProcessCounts::from_records(&records);
        self.report.alert_events = self.alerts.evaluate(&records);
        self.report.processes = records;
    }

    fn refresh_memory(&mut self) {
        self.report.memory = self.system.collect_memory().unwrap_or_else(|e| {
            debug!(error = %e, "memory unavailable");
            MemoryRecord::default()
        });
        self.report.loadavg = self.system.collect_loadavg().unwrap_or_else(|e| {
            debug!(error = %e, "load average unavailable");
            LoadAverage::default()
        });
        self.report.uptime_secs = self.system.collect_uptime().unwrap_or_else(|e| {
            debug!(error = %e, "uptime unavailable");
            0.0
        });
    }

    fn refresh_interfaces(&mut self, wall: DateTime<Utc>) {
        let interfaces = self.network.collect_interfaces();
        let counters = self.network.collect_counters();
        let rates = self.interface_state.update(&counters, wall);

        let is_loopback = |name: &str| {
            interfaces
                .iter()
                .find(|i| i.name == name)
                .map_or(name == "lo", |i| i.kind == InterfaceKind::Loopback)
        };
        let external: Vec<&InterfaceRate> = rates
            .iter()
            .filter(|r| !is_loopback(&r.interface))
            .collect();
        // Nothing is pushed until some interface has a baseline.
        if external
            .iter()
            .any(|r| r.rx_bytes_per_sec.is_some() || r.tx_bytes_per_sec.is_some())
        {
            let rx: f64 = external.iter().filter_map(|r| r.rx_bytes_per_sec).sum();
            let tx: f64 = external.iter().filter_map(|r| r.tx_bytes_per_sec).sum();
            self.histories.rx_rate.push(rx as f32);
            self.histories.tx_rate.push(tx as f32);
        }

        self.report.interfaces = interfaces;
        self.report.interface_rates = rates;
    }
}
