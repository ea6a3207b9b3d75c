//! System collector for gathering global metrics from `/proc/`.

use crate::collector::procfs::parser::{
    parse_cpu_aggregate, parse_cpu_count, parse_cpu_model, parse_loadavg, parse_meminfo,
    parse_uptime,
};
use crate::collector::procfs::process::CollectError;
use crate::collector::traits::FileSystem;
use crate::model::{CpuSample, HostInfo, LoadAverage, MemoryRecord};
use std::path::Path;

/// Collects system-wide metrics from `/proc/`.
pub struct SystemCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> SystemCollector<F> {
    /// Creates a new system collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn read(&self, relative: &str) -> Result<String, CollectError> {
        let path = format!("{}/{}", self.proc_path, relative);
        self.fs
            .read_to_string(Path::new(&path))
            .map_err(|_| CollectError::SourceUnavailable(path))
    }

    /// Collects RAM and swap usage from `/proc/meminfo`.
    pub fn collect_memory(&self) -> Result<MemoryRecord, CollectError> {
        let content = self.read("meminfo")?;
        let info = parse_meminfo(&content).map_err(|e| CollectError::Parse(e.message))?;

        let used_kb = info
            .mem_total
            .saturating_sub(info.mem_free)
            .saturating_sub(info.buffers)
            .saturating_sub(info.cached);

        Ok(MemoryRecord {
            total_ram: info.mem_total * 1024,
            free_ram: info.mem_free * 1024,
            used_ram: used_kb * 1024,
            total_swap: info.swap_total * 1024,
            free_swap: info.swap_free * 1024,
            used_swap: info.swap_total.saturating_sub(info.swap_free) * 1024,
        })
    }

    /// Reads the aggregate CPU counters from `/proc/stat`.
    pub fn collect_cpu_sample(&self) -> Result<CpuSample, CollectError> {
        let content = self.read("stat")?;
        parse_cpu_aggregate(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Collects load average from `/proc/loadavg`.
    pub fn collect_loadavg(&self) -> Result<LoadAverage, CollectError> {
        let content = self.read("loadavg")?;
        parse_loadavg(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Seconds since boot from `/proc/uptime`.
    pub fn collect_uptime(&self) -> Result<f64, CollectError> {
        let content = self.read("uptime")?;
        parse_uptime(&content).map_err(|e| CollectError::Parse(e.message))
    }

    /// Static host identity. Unreadable parts are left empty or zero.
    pub fn collect_host_info(&self) -> HostInfo {
        let hostname = self
            .read("sys/kernel/hostname")
            .map(|h| h.trim().to_string())
            .unwrap_or_default();
        let cpu_model = self
            .read("cpuinfo")
            .ok()
            .and_then(|c| parse_cpu_model(&c))
            .unwrap_or_default();
        let cpu_cores = self
            .read("stat")
            .map(|c| parse_cpu_count(&c))
            .unwrap_or(0);

        HostInfo {
            hostname,
            os_name: std::env::consts::OS.to_string(),
            username: current_username(),
            cpu_model,
            cpu_cores,
        }
    }
}

fn current_username() -> String {
    ["USER", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_collect_memory() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let mem = collector.collect_memory().unwrap();
        assert_eq!(mem.total_ram, 16384000 * 1024);
        assert_eq!(mem.free_ram, 8192000 * 1024);
        // 16384000 - 8192000 - 512000 - 2048000
        assert_eq!(mem.used_ram, 5632000 * 1024);
        assert_eq!(mem.total_swap, 4096000 * 1024);
        assert_eq!(mem.used_swap, 1024000 * 1024);
    }

    #[test]
    fn test_used_ram_never_underflows() {
        let fs = MockFs::new();
        fs.add_file(
            "/proc/meminfo",
            "MemTotal: 1000 kB\nMemFree: 800 kB\nBuffers: 300 kB\nCached: 300 kB\n",
        );
        let collector = SystemCollector::new(fs, "/proc");

        let mem = collector.collect_memory().unwrap();
        assert_eq!(mem.used_ram, 0);
        assert_eq!(mem.used_swap, 0);
    }

    #[test]
    fn test_collect_cpu_sample() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let cpu = collector.collect_cpu_sample().unwrap();
        assert_eq!(cpu.user, 10000);
        assert_eq!(cpu.idle, 80000);
    }

    #[test]
    fn test_collect_loadavg_and_uptime() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let load = collector.collect_loadavg().unwrap();
        assert!((load.one - 0.15).abs() < 0.001);
        let uptime = collector.collect_uptime().unwrap();
        assert!((uptime - 12345.67).abs() < 0.001);
    }

    #[test]
    fn test_missing_sources() {
        let collector = SystemCollector::new(MockFs::new(), "/proc");

        assert!(matches!(
            collector.collect_memory(),
            Err(CollectError::SourceUnavailable(_))
        ));
        assert!(collector.collect_cpu_sample().is_err());
        assert!(collector.collect_loadavg().is_err());

        let host = collector.collect_host_info();
        assert_eq!(host.hostname, "");
        assert_eq!(host.cpu_cores, 0);
        assert_eq!(host.os_name, std::env::consts::OS);
    }

    #[test]
    fn test_collect_host_info() {
        let fs = MockFs::typical_system();
        let collector = SystemCollector::new(fs, "/proc");

        let host = collector.collect_host_info();
        assert_eq!(host.hostname, "testhost");
        assert_eq!(host.cpu_model, "Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz");
        assert_eq!(host.cpu_cores, 4);
        assert!(!host.username.is_empty());
    }
}
