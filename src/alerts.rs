//! Per-process CPU and memory threshold alerts.

use crate::model::ProcessRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlertKind {
    Cpu,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessAlert {
    pub pid: u32,
    pub name: String,
    /// Percent of total CPU time.
    pub cpu_threshold: f32,
    /// Percent of total RAM.
    pub memory_threshold: f32,
    pub cpu_active: bool,
    pub memory_active: bool,
    /// The watched pid was missing from the last evaluation.
    pub gone: bool,
}

impl ProcessAlert {
    pub fn is_active(&self) -> bool {
        self.cpu_active || self.memory_active
    }
}

/// A threshold crossing reported by `AlertRegistry::evaluate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub pid: u32,
    pub name: String,
    pub kind: AlertKind,
    pub value: f32,
    pub threshold: f32,
}

#[derive(Debug, Default)]
pub struct AlertRegistry {
    alerts: HashMap<u32, ProcessAlert>,
}

impl AlertRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watches `pid`. An existing alert keeps its state and takes the new
    /// thresholds.
    pub fn add(&mut self, pid: u32, name: impl Into<String>, cpu_threshold: f32, memory_threshold: f32) {
        let name = name.into();
        self.alerts
            .entry(pid)
            .and_modify(|a| {
                a.cpu_threshold = cpu_threshold;
                a.memory_threshold = memory_threshold;
            })
            .or_insert(ProcessAlert {
                pid,
                name,
                cpu_threshold,
                memory_threshold,
                cpu_active: false,
                memory_active: false,
                gone: false,
            });
    }

    pub fn remove(&mut self, pid: u32) -> Option<ProcessAlert> {
        self.alerts.remove(&pid)
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessAlert> {
        self.alerts.get(&pid)
    }

    /// All alerts, ordered by pid.
    pub fn alerts(&self) -> Vec<&ProcessAlert> {
        let mut alerts: Vec<&ProcessAlert> = self.alerts.values().collect();
        alerts.sort_by_key(|a| a.pid);
        alerts
    }

    pub fn active(&self) -> Vec<&ProcessAlert> {
        self.alerts().into_iter().filter(|a| a.is_active()).collect()
    }

    /// Updates every flag from the current records.
    ///
    /// A flag is active while the value is strictly above its threshold.
    /// Only flags that switched on in this call are returned, so a process
    /// that stays hot is reported once per crossing.
    pub fn evaluate(&mut self, processes: &[ProcessRecord]) -> Vec<AlertEvent> {
        let by_pid: HashMap<u32, &ProcessRecord> = processes.iter().map(|p| (p.pid, p)).collect();
        let mut events = Vec::new();

        for alert in self.alerts.values_mut() {
            let Some(proc) = by_pid.get(&alert.pid) else {
                alert.gone = true;
                alert.cpu_active = false;
                alert.memory_active = false;
                continue;
            };
            alert.gone = false;

            let cpu_hot = proc.cpu_usage > alert.cpu_threshold;
            if cpu_hot && !alert.cpu_active {
                events.push(AlertEvent {
                    pid: alert.pid,
                    name: alert.name.clone(),
                    kind: AlertKind::Cpu,
                    value: proc.cpu_usage,
                    threshold: alert.cpu_threshold,
                });
            }
            alert.cpu_active = cpu_hot;

            let mem_hot = proc.memory_usage > alert.memory_threshold;
            if mem_hot && !alert.memory_active {
                events.push(AlertEvent {
                    pid: alert.pid,
                    name: alert.name.clone(),
                    kind: AlertKind::Memory,
                    value: proc.memory_usage,
                    threshold: alert.memory_threshold,
                });
            }
            alert.memory_active = mem_hot;
        }

        events.sort_by_key(|e| e.pid);
        for e in &events {
            info!(pid = e.pid, name = %e.name, kind = ?e.kind, value = e.value, threshold = e.threshold, "alert raised");
        }
        events
    }
}
