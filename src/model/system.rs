//! System-wide records: CPU counters, memory, disks, sensors, host identity.

use serde::{Deserialize, Serialize};

/// Aggregate CPU counters from the first `cpu` line of `/proc/stat`.
///
/// All values are jiffies accumulated since boot.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct CpuSample {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuSample {
    /// Time spent doing nothing: idle + iowait.
    pub fn idle_total(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }

    /// Sum of all accounted jiffies.
    ///
    /// `guest` and `guest_nice` are already included in `user` and `nice`
    /// by the kernel, so they are not added again.
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// RAM and swap usage, in bytes.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct MemoryRecord {
    pub total_ram: u64,
    pub free_ram: u64,
    /// total - free - buffers - cached, like `free(1)`.
    pub used_ram: u64,
    pub total_swap: u64,
    pub free_swap: u64,
    pub used_swap: u64,
}

impl MemoryRecord {
    pub fn ram_usage_percent(&self) -> f32 {
        percent(self.used_ram, self.total_ram)
    }

    pub fn swap_usage_percent(&self) -> f32 {
        percent(self.used_swap, self.total_swap)
    }
}

/// Capacity of one mounted block device.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct DiskRecord {
    pub mount_point: String,
    pub device: String,
    pub total_bytes: u64,
    /// Space available to unprivileged users.
    pub free_bytes: u64,
    /// (blocks - bfree) * frsize, matching `df`.
    pub used_bytes: u64,
}

impl DiskRecord {
    pub fn usage_percent(&self) -> f32 {
        percent(self.used_bytes, self.total_bytes)
    }
}

/// Where a sensor value came from.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// Read directly from a kernel sensor.
    Measured,
    /// Derived from a related signal (e.g. fan speed from temperature).
    Estimated,
    /// No signal at all; a conservative default.
    Assumed,
}

/// A value tagged with its provenance.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Reading<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Reading<T> {
    pub fn measured(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Measured,
        }
    }

    pub fn estimated(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Estimated,
        }
    }

    pub fn assumed(value: T) -> Self {
        Self {
            value,
            provenance: Provenance::Assumed,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.provenance == Provenance::Measured
    }
}

/// Fan state as reported (or guessed) from hwmon.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct FanRecord {
    pub active: Reading<bool>,
    /// Revolutions per minute.
    pub speed_rpm: Reading<u32>,
    /// PWM duty, 0..=255.
    pub level: Reading<u8>,
}

/// Thermal and fan readings taken together on the CPU cadence.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct SensorRecord {
    /// Degrees Celsius; 0.0 when no thermal source exists.
    pub temperature_c: f32,
    pub fan: FanRecord,
}

/// Static facts about the host, read once at startup.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct HostInfo {
    pub hostname: String,
    pub os_name: String,
    pub username: String,
    pub cpu_model: String,
    pub cpu_cores: usize,
}

/// 1, 5 and 15 minute load averages.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct LoadAverage {
    pub one: f32,
    pub five: f32,
    pub fifteen: f32,
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percent(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 100.0 / whole as f64) as f32
}
