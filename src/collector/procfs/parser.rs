//! Parsers for `/proc` and `/sys` text sources.
//!
//! These are pure functions that parse the content of various kernel files
//! into structured data. They are designed to be easily testable with string
//! inputs; the collectors decide what a failure means for the caller.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::model::{
    ConnectionRecord, CpuSample, LoadAverage, NetDevCounters, Protocol, TcpState,
};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

// ============ CPU ============

/// Parses the aggregate `cpu` line of `/proc/stat`.
///
/// Field order is fixed by the kernel: user nice system idle iowait irq
/// softirq steal guest guest_nice. Older kernels print fewer columns; the
/// missing ones read as zero.
pub fn parse_cpu_aggregate(content: &str) -> Result<CpuSample, ParseError> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| ParseError::new("missing aggregate cpu line"))?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|s| s.parse().map_err(|_| ParseError::new(format!("invalid cpu counter '{}'", s))))
        .collect::<Result<_, _>>()?;

    if values.len() < 4 {
        return Err(ParseError::new(format!(
            "not enough cpu counters: expected 4+, got {}",
            values.len()
        )));
    }

    let get = |idx: usize| values.get(idx).copied().unwrap_or(0);
    Ok(CpuSample {
        user: get(0),
        nice: get(1),
        system: get(2),
        idle: get(3),
        iowait: get(4),
        irq: get(5),
        softirq: get(6),
        steal: get(7),
        guest: get(8),
        guest_nice: get(9),
    })
}

/// Counts the per-core `cpuN` lines of `/proc/stat`.
pub fn parse_cpu_count(content: &str) -> usize {
    content
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .filter(|tag| {
            tag.strip_prefix("cpu")
                .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        })
        .count()
}

/// Returns the first `model name` from `/proc/cpuinfo`.
pub fn parse_cpu_model(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "model name").then(|| value.trim().to_string())
    })
}

// ============ Process ============

/// Fields of `/proc/[pid]/stat` that the sampler uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStat {
    pub pid: u32,
    pub comm: String,
    pub state: char,
    pub ppid: u32,
    pub utime: u64,
    pub stime: u64,
    pub priority: i32,
    pub nice: i32,
    pub vsize: u64,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field can contain spaces and parentheses, so positional fields
/// are counted from the *last* `)`.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    let pid: u32 = content[..open_paren]
        .trim()
        .parse()
        .map_err(|_| ParseError::new("invalid pid"))?;

    let comm = content[open_paren + 1..close_paren].to_string();

    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() < 21 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 21+, got {}",
            fields.len()
        )));
    }

    let parse_i64 = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };
    let parse_u64 = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        pid,
        comm,
        state: fields[0].chars().next().unwrap_or('?'),
        ppid: parse_i64(1, "ppid")?.max(0) as u32,
        utime: parse_u64(11, "utime")?,
        stime: parse_u64(12, "stime")?,
        priority: parse_i64(15, "priority")? as i32,
        nice: parse_i64(16, "nice")? as i32,
        vsize: parse_u64(20, "vsize")?,
    })
}

/// Extracts `VmRSS` from `/proc/[pid]/status`, converted from kB to bytes.
///
/// Kernel threads have no `VmRSS` line; that reads as 0.
pub fn parse_vm_rss(content: &str) -> u64 {
    content
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .map(|value| {
            let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().unwrap_or(0).saturating_mul(1024)
        })
        .unwrap_or(0)
}

// ============ Memory / load / uptime ============

/// Parsed data from `/proc/meminfo`, in kB.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Parses `/proc/meminfo` content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();

    let parse_kb = |line: &str| -> u64 {
        line.split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };

    for line in content.lines() {
        let Some(key) = line.split(':').next() else {
            continue;
        };
        match key {
            "MemTotal" => info.mem_total = parse_kb(line),
            "MemFree" => info.mem_free = parse_kb(line),
            "MemAvailable" => info.mem_available = parse_kb(line),
            "Buffers" => info.buffers = parse_kb(line),
            "Cached" => info.cached = parse_kb(line),
            "SwapTotal" => info.swap_total = parse_kb(line),
            "SwapFree" => info.swap_free = parse_kb(line),
            _ => {}
        }
    }

    if info.mem_total == 0 {
        return Err(ParseError::new("missing MemTotal"));
    }
    Ok(info)
}

/// Parses the three averages of `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Result<LoadAverage, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let parse = |idx: usize, name: &str| -> Result<f32, ParseError> {
        parts[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(LoadAverage {
        one: parse(0, "load1")?,
        five: parse(1, "load5")?,
        fifteen: parse(2, "load15")?,
    })
}

/// Parses the first value of `/proc/uptime` (seconds since boot).
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}

/// Parses a single integer sysfs attribute such as `fan1_input` or `temp`.
pub fn parse_sysfs_int(content: &str) -> Result<i64, ParseError> {
    let trimmed = content.trim();
    trimmed
        .parse()
        .map_err(|_| ParseError::new(format!("invalid sysfs integer '{}'", trimmed)))
}

// ============ Network Device Stats Parser ============

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
///
/// Lines with fewer than 16 counters are skipped.
pub fn parse_net_dev(content: &str) -> Vec<NetDevCounters> {
    let mut devices = Vec::new();

    for line in content.lines() {
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((name, rest)) = line.trim_start().split_once(':') else {
            continue;
        };

        let values: Vec<u64> = match rest.split_whitespace().map(str::parse).collect() {
            Ok(values) => values,
            Err(_) => continue,
        };
        if values.len() < 16 {
            continue;
        }

        devices.push(NetDevCounters {
            interface: name.trim().to_string(),
            rx_bytes: values[0],
            rx_packets: values[1],
            rx_errs: values[2],
            rx_drop: values[3],
            rx_fifo: values[4],
            rx_frame: values[5],
            rx_compressed: values[6],
            rx_multicast: values[7],
            tx_bytes: values[8],
            tx_packets: values[9],
            tx_errs: values[10],
            tx_drop: values[11],
            tx_fifo: values[12],
            tx_colls: values[13],
            tx_carrier: values[14],
            tx_compressed: values[15],
        });
    }

    devices
}

// ============ Mount table ============

/// One line of `/proc/mounts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
}

/// Parses `/proc/mounts` (`device mount_point fs_type options dump pass`).
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some(MountEntry {
                device: parts.next()?.to_string(),
                mount_point: unescape_mount_path(parts.next()?),
                fs_type: parts.next()?.to_string(),
            })
        })
        .collect()
}

/// `/proc/mounts` escapes space, tab, newline and backslash as octal.
fn unescape_mount_path(raw: &str) -> String {
    raw.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

/// Filesystem types that never back a real block device.
pub const VIRTUAL_FS_TYPES: &[&str] = &["tmpfs", "devtmpfs", "sysfs", "proc"];

/// Device prefix of real block devices.
pub const REAL_DEVICE_PREFIX: &str = "/dev/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountClass {
    Physical,
    Virtual,
    /// Not backed by a `/dev/` node (overlay, nfs, cgroup, ...).
    NoDevice,
}

fn is_virtual_fs(entry: &MountEntry) -> bool {
    VIRTUAL_FS_TYPES.contains(&entry.fs_type.as_str())
}

fn has_real_device(entry: &MountEntry) -> bool {
    entry.device.starts_with(REAL_DEVICE_PREFIX)
}

/// First match wins; anything left over is `NoDevice`.
const MOUNT_RULES: &[(fn(&MountEntry) -> bool, MountClass)] = &[
    (is_virtual_fs, MountClass::Virtual),
    (has_real_device, MountClass::Physical),
];

pub fn classify_mount(entry: &MountEntry) -> MountClass {
    MOUNT_RULES
        .iter()
        .find(|(matches, _)| matches(entry))
        .map(|(_, class)| *class)
        .unwrap_or(MountClass::NoDevice)
}

pub fn is_physical_mount(entry: &MountEntry) -> bool {
    classify_mount(entry) == MountClass::Physical
}

// ============ TCP table ============

/// Decodes `AAAAAAAA:PPPP` from `/proc/net/tcp`.
///
/// The address is the raw `__be32` printed as a host-order (little-endian)
/// integer; the port is printed big-endian.
pub fn parse_hex_endpoint(field: &str) -> Result<SocketAddrV4, ParseError> {
    let (addr_hex, port_hex) = field
        .split_once(':')
        .ok_or_else(|| ParseError::new(format!("invalid endpoint '{}'", field)))?;

    if addr_hex.len() != 8 {
        return Err(ParseError::new(format!(
            "expected 8 hex digits for IPv4 address, got '{}'",
            addr_hex
        )));
    }

    let raw = u32::from_str_radix(addr_hex, 16)
        .map_err(|_| ParseError::new(format!("invalid address '{}'", addr_hex)))?;
    let port = u16::from_str_radix(port_hex, 16)
        .map_err(|_| ParseError::new(format!("invalid port '{}'", port_hex)))?;

    Ok(SocketAddrV4::new(Ipv4Addr::from(raw.to_le_bytes()), port))
}

/// Parses `/proc/net/tcp`. The header and malformed lines are skipped.
///
/// Format:
///   sl  local_address rem_address   st tx_queue rx_queue ...
///    0: 0100007F:0277 00000000:0000 0A 00000000:00000000 ...
pub fn parse_tcp_table(content: &str) -> Vec<ConnectionRecord> {
    let mut connections = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 || !parts[0].ends_with(':') {
            continue;
        }

        let (Ok(local), Ok(remote)) = (parse_hex_endpoint(parts[1]), parse_hex_endpoint(parts[2]))
        else {
            continue;
        };

        connections.push(ConnectionRecord {
            protocol: Protocol::Tcp,
            local,
            remote,
            state: TcpState::from_hex(parts[3]),
        });
    }

    connections
}
