//! Host metric collectors for Linux.
//!
//! This module reads processes, system counters, mounts, network interfaces
//! and sensors from `/proc` and `/sys`, with mocks so everything can be tested
//! without a real Linux host.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           Collectors                           │
//! │  ┌──────────────────┐ ┌─────────────────┐ ┌─────────────────┐  │
//! │  │ ProcessCollector │ │ SystemCollector │ │ SensorCollector │  │
//! │  │ - /proc/[pid]/*  │ │ - /proc/stat    │ │ - /sys/class/   │  │
//! │  │                  │ │ - /proc/meminfo │ │   thermal,hwmon │  │
//! │  └────────┬─────────┘ └────────┬────────┘ └────────┬────────┘  │
//! │  ┌────────┴─────────┐ ┌────────┴─────────┐         │           │
//! │  │  DiskCollector   │ │ NetworkCollector │         │           │
//! │  │ - /proc/mounts   │ │ - /proc/net/*    │         │           │
//! │  └──┬──────────┬────┘ └───┬──────────┬───┘         │           │
//! │     │          └─────┬────┘          │             │           │
//! │     │         ┌──────▼──────┐  ┌─────▼──────┐      │           │
//! │     │         │   HostApi   │  │ FileSystem ◄──────┘           │
//! │     │         │  (statvfs,  │  │  (trait)   │                  │
//! │     │         │ getifaddrs) │  └─────▲──────┘                  │
//! │     │         └─────────────┘        │                         │
//! │     └────────────────────────────────┘                         │
//! └────────────────────────────────────────────────────────────────┘
//!         RealFs / RealHost (Linux)      MockFs / MockHost (tests)
//! ```
//!
//! # Usage
//!
//! ```
//! use hostpulse::collector::{MockFs, ProcessCollector};
//!
//! let fs = MockFs::typical_system();
//! let collector = ProcessCollector::new(fs, "/proc");
//! let processes = collector.collect_all_processes().unwrap();
//! assert!(!processes.is_empty());
//! ```

pub mod disks;
pub mod mock;
pub mod network;
pub mod procfs;
pub mod sensors;
pub mod traits;

pub use disks::DiskCollector;
pub use mock::{MockFs, MockHost};
pub use network::NetworkCollector;
pub use procfs::{CollectError, ParseError, ProcessCollector, ProcessTree, SystemCollector};
pub use sensors::SensorCollector;
pub use traits::{FileSystem, FsStats, HostApi, InterfaceAddress, RealFs, RealHost};
