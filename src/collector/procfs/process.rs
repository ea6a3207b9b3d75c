//! Process collector for gathering per-process records from `/proc/[pid]/`.

use crate::collector::procfs::parser::{parse_meminfo, parse_proc_stat, parse_vm_rss};
use crate::collector::traits::FileSystem;
use crate::model::{ProcessRecord, ProcessState, percent};
use std::path::Path;
use tracing::debug;

/// Error type for collection failures.
#[derive(Debug)]
pub enum CollectError {
    /// A source file the collector depends on is missing or unreadable.
    SourceUnavailable(String),
    /// Process disappeared during collection.
    ProcessGone(u32),
    /// I/O error reading process files.
    Io(std::io::Error),
    /// Source content did not match the expected format.
    Parse(String),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::SourceUnavailable(path) => write!(f, "source unavailable: {}", path),
            CollectError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

/// Enumerates processes from `/proc/[pid]/` files.
pub struct ProcessCollector<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcessCollector<F> {
    /// Creates a new process collector.
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

    /// Total RAM in bytes, or 0 when meminfo cannot be read.
    fn total_ram(&self) -> u64 {
        let path = format!("{}/meminfo", self.proc_path);
        self.fs
            .read_to_string(Path::new(&path))
            .ok()
            .and_then(|content| parse_meminfo(&content).ok())
            .map(|info| info.mem_total.saturating_mul(1024))
            .unwrap_or(0)
    }

    /// Builds the record of a single process.
    ///
    /// `cpu_usage` is left at 0; it needs the previous sample and is filled
    /// in by `rates::ProcessCpuState`.
    pub fn collect_process(&self, pid: u32, total_ram: u64) -> Result<ProcessRecord, CollectError> {
        let proc_dir = format!("{}/{}", self.proc_path, pid);

        let stat_path = format!("{}/stat", proc_dir);
        let stat_content = self
            .fs
            .read_to_string(Path::new(&stat_path))
            .map_err(|_| CollectError::ProcessGone(pid))?;
        let stat = parse_proc_stat(&stat_content).map_err(|e| CollectError::Parse(e.message))?;

        let comm_path = format!("{}/comm", proc_dir);
        let name = self
            .fs
            .read_to_string(Path::new(&comm_path))
            .map(|comm| comm.trim().to_string())
            .unwrap_or_else(|_| stat.comm.clone());
        if name.is_empty() {
            return Err(CollectError::ProcessGone(pid));
        }

        // Kernel threads have no VmRSS; an unreadable status reads as 0 too.
        let status_path = format!("{}/status", proc_dir);
        let rss = self
            .fs
            .read_to_string(Path::new(&status_path))
            .map(|content| parse_vm_rss(&content))
            .unwrap_or(0);

        Ok(ProcessRecord {
            pid: stat.pid,
            ppid: stat.ppid,
            name,
            state: ProcessState::from_code(stat.state),
            vsize: stat.vsize,
            rss,
            utime: stat.utime,
            stime: stat.stime,
            priority: stat.priority,
            nice: stat.nice,
            cpu_usage: 0.0,
            memory_usage: percent(rss, total_ram),
        })
    }

    /// Collects records for all processes, ordered by pid.
    ///
    /// Processes that disappear during collection are silently skipped.
    /// Malformed entries are skipped and logged.
    pub fn collect_all_processes(&self) -> Result<Vec<ProcessRecord>, CollectError> {
        let proc_path = Path::new(&self.proc_path);
        let entries = self
            .fs
            .read_dir(proc_path)
            .map_err(|_| CollectError::SourceUnavailable(self.proc_path.clone()))?;

        let total_ram = self.total_ram();
        let mut processes = Vec::new();

        for entry in entries {
            if let Some(name) = entry.file_name().and_then(|n| n.to_str())
                && let Ok(pid) = name.parse::<u32>()
                && pid > 0
            {
                match self.collect_process(pid, total_ram) {
                    Ok(record) => processes.push(record),
                    Err(CollectError::ProcessGone(_)) => continue,
                    Err(e) => debug!(pid, error = %e, "skipping process"),
                }
            }
        }

        processes.sort_by_key(|p| p.pid);
        Ok(processes)
    }
}
