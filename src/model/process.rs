//! Per-process records built from `/proc/[pid]/`.
//!
//! Records are rebuilt from scratch on every enumeration pass; the only
//! cross-pass memory is the CPU tick state in [`crate::rates::ProcessCpuState`].

use serde::{Deserialize, Serialize};

/// Scheduler state of a process, decoded from the single-character code in
/// `/proc/[pid]/stat` field 3.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
pub enum ProcessState {
    Running,
    #[default]
    Sleeping,
    /// Uninterruptible sleep, usually waiting on disk I/O (`D`).
    DiskSleep,
    Stopped,
    /// Stopped by a debugger (`t`).
    Tracing,
    Zombie,
    Dead,
    /// Idle kernel thread (`I`).
    Idle,
    /// Any code the kernel may add later.
    Other(char),
}

/// Coarse bucket used for the summary counts.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum StateCategory {
    Running,
    Sleeping,
    Stopped,
    Zombie,
}

impl ProcessState {
    /// Decodes a state character. Total: unknown codes become `Other`.
    pub fn from_code(code: char) -> Self {
        match code {
            'R' => ProcessState::Running,
            'S' => ProcessState::Sleeping,
            'D' => ProcessState::DiskSleep,
            'T' => ProcessState::Stopped,
            't' => ProcessState::Tracing,
            'Z' => ProcessState::Zombie,
            'X' | 'x' => ProcessState::Dead,
            'I' => ProcessState::Idle,
            other => ProcessState::Other(other),
        }
    }

    /// Returns the original state character.
    pub fn code(&self) -> char {
        match self {
            ProcessState::Running => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::DiskSleep => 'D',
            ProcessState::Stopped => 'T',
            ProcessState::Tracing => 't',
            ProcessState::Zombie => 'Z',
            ProcessState::Dead => 'X',
            ProcessState::Idle => 'I',
            ProcessState::Other(c) => *c,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            ProcessState::Running => "Running",
            ProcessState::Sleeping => "Sleeping",
            ProcessState::DiskSleep => "Disk Sleep",
            ProcessState::Stopped => "Stopped",
            ProcessState::Tracing => "Tracing",
            ProcessState::Zombie => "Zombie",
            ProcessState::Dead => "Dead",
            ProcessState::Idle => "Idle",
            ProcessState::Other(_) => "Unknown",
        }
    }

    /// Folds the state into one of the four summary buckets.
    ///
    /// Disk sleep, idle kernel threads, dead tasks and unknown codes all count
    /// as sleeping so that every process lands in exactly one bucket.
    pub fn category(&self) -> StateCategory {
        match self {
            ProcessState::Running => StateCategory::Running,
            ProcessState::Stopped | ProcessState::Tracing => StateCategory::Stopped,
            ProcessState::Zombie => StateCategory::Zombie,
            ProcessState::Sleeping
            | ProcessState::DiskSleep
            | ProcessState::Idle
            | ProcessState::Dead
            | ProcessState::Other(_) => StateCategory::Sleeping,
        }
    }
}

/// One live process.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ProcessRecord {
    pub pid: u32,
    pub ppid: u32,
    pub name: String,
    pub state: ProcessState,
    /// Virtual memory size in bytes (stat field 23).
    pub vsize: u64,
    /// Resident set size in bytes (`VmRSS` from status).
    pub rss: u64,
    /// Cumulative user time in clock ticks.
    pub utime: u64,
    /// Cumulative system time in clock ticks.
    pub stime: u64,
    pub priority: i32,
    pub nice: i32,
    /// Share of the global CPU time delta since the previous pass, in percent.
    pub cpu_usage: f32,
    /// Resident size as a share of total RAM, in percent.
    pub memory_usage: f32,
}

impl ProcessRecord {
    /// Total CPU ticks consumed (utime + stime).
    pub fn cpu_ticks(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}

/// Number of processes in each state bucket.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct ProcessCounts {
    pub running: usize,
    pub sleeping: usize,
    pub stopped: usize,
    pub zombie: usize,
}

impl ProcessCounts {
    pub fn from_records(records: &[ProcessRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            counts.add(record.state);
        }
        counts
    }

    pub fn add(&mut self, state: ProcessState) {
        match state.category() {
            StateCategory::Running => self.running += 1,
            StateCategory::Sleeping => self.sleeping += 1,
            StateCategory::Stopped => self.stopped += 1,
            StateCategory::Zombie => self.zombie += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.running + self.sleeping + self.stopped + self.zombie
    }
}
