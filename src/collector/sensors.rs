//! Temperature and fan readings with fallbacks for missing sensors.
//!
//! Laptops and VMs often expose only part of hwmon. Each value is tagged
//! with a [`Provenance`](crate::model::Provenance) so the caller can tell a
//! measured fan speed from one guessed out of the CPU temperature.

use crate::collector::procfs::parser::parse_sysfs_int;
use crate::collector::traits::FileSystem;
use crate::model::{FanRecord, Reading, SensorRecord};
use std::path::{Path, PathBuf};

pub const IDLE_FAN_RPM: u32 = 1000;
pub const MAX_FAN_RPM: u32 = 4000;
const COOL_TEMP_C: f32 = 30.0;
const HOT_TEMP_C: f32 = 80.0;
/// RPM added per degree between the cool and hot points.
const RPM_PER_DEGREE: f32 = 60.0;
const MAX_PWM: u32 = 255;

/// Linear fan curve: 1000 RPM at or below 30°C, 4000 RPM at or above 80°C.
pub fn estimate_fan_speed(temp_c: f32) -> u32 {
    if temp_c <= COOL_TEMP_C {
        IDLE_FAN_RPM
    } else if temp_c >= HOT_TEMP_C {
        MAX_FAN_RPM
    } else {
        IDLE_FAN_RPM + ((temp_c - COOL_TEMP_C) * RPM_PER_DEGREE) as u32
    }
}

/// Maps RPM onto the 0..=255 PWM scale, with `MAX_FAN_RPM` as full duty.
pub fn estimate_fan_level(speed_rpm: u32) -> u8 {
    let level = (speed_rpm as u64 * MAX_PWM as u64 / MAX_FAN_RPM as u64).min(MAX_PWM as u64);
    level as u8
}

/// True for `<prefix><digits><suffix>`, e.g. `fan2_input`.
fn is_indexed_attr(name: &str, prefix: &str, suffix: &str) -> bool {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .is_some_and(|idx| !idx.is_empty() && idx.bytes().all(|b| b.is_ascii_digit()))
}

pub struct SensorCollector<F: FileSystem> {
    fs: F,
    sys_path: String,
}

impl<F: FileSystem> SensorCollector<F> {
    /// # Arguments
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, sys_path: impl Into<String>) -> Self {
        Self {
            fs,
            sys_path: sys_path.into(),
        }
    }

    /// Every attribute file under every `hwmonN`, in path order.
    fn hwmon_attrs(&self) -> Vec<PathBuf> {
        let root = format!("{}/class/hwmon", self.sys_path);
        let Ok(mut devices) = self.fs.read_dir(Path::new(&root)) else {
            return Vec::new();
        };
        devices.sort();

        let mut attrs = Vec::new();
        for device in devices {
            if let Ok(mut files) = self.fs.read_dir(&device) {
                files.sort();
                attrs.extend(files);
            }
        }
        attrs
    }

    fn attrs_matching(&self, prefix: &str, suffix: &str) -> Vec<PathBuf> {
        self.hwmon_attrs()
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| is_indexed_attr(n, prefix, suffix))
            })
            .collect()
    }

    fn read_int(&self, path: &Path) -> Option<i64> {
        self.fs
            .read_to_string(path)
            .ok()
            .and_then(|c| parse_sysfs_int(&c).ok())
    }

    /// Whether any fan is enabled.
    ///
    /// With no enable switches at all the fan is assumed to be running,
    /// since most hardware without a switch cannot turn it off.
    pub fn fan_status(&self) -> Reading<bool> {
        let values: Vec<i64> = self
            .attrs_matching("fan", "_enable")
            .into_iter()
            .chain(self.attrs_matching("pwm", "_enable"))
            .filter_map(|p| self.read_int(&p))
            .collect();

        if values.is_empty() {
            Reading::assumed(true)
        } else {
            Reading::measured(values.iter().any(|v| *v != 0))
        }
    }

    /// First non-zero tachometer, else estimated from `temp_c`.
    pub fn fan_speed(&self, temp_c: f32) -> Reading<u32> {
        self.attrs_matching("fan", "_input")
            .iter()
            .filter_map(|p| self.read_int(p))
            .find(|rpm| *rpm > 0)
            .map(|rpm| Reading::measured(rpm.min(u32::MAX as i64) as u32))
            .unwrap_or_else(|| Reading::estimated(estimate_fan_speed(temp_c)))
    }

    /// First `pwmN` duty value, else derived from `speed_rpm`.
    pub fn fan_level(&self, speed_rpm: u32) -> Reading<u8> {
        self.attrs_matching("pwm", "")
            .iter()
            .find_map(|p| self.read_int(p))
            .map(|pwm| Reading::measured(pwm.clamp(0, MAX_PWM as i64) as u8))
            .unwrap_or_else(|| Reading::estimated(estimate_fan_level(speed_rpm)))
    }

    /// CPU temperature in °C, or 0.0 when no thermal source exists.
    pub fn cpu_temperature(&self) -> f32 {
        let zone = format!("{}/class/thermal/thermal_zone0/temp", self.sys_path);
        self.read_int(Path::new(&zone))
            .or_else(|| {
                self.attrs_matching("temp", "_input")
                    .iter()
                    .find(|p| p.file_name().is_some_and(|n| n == "temp1_input"))
                    .and_then(|p| self.read_int(p))
            })
            .map(|milli| milli as f32 / 1000.0)
            .unwrap_or(0.0)
    }

    /// Temperature and all fan values, each with its fallback applied.
    pub fn collect(&self) -> SensorRecord {
        let temperature_c = self.cpu_temperature();
        let speed_rpm = self.fan_speed(temperature_c);
        let level = self.fan_level(speed_rpm.value);
        SensorRecord {
            temperature_c,
            fan: FanRecord {
                active: self.fan_status(),
                speed_rpm,
                level,
            },
        }
    }
}
