//! Display-ready records produced by the sampler.
//!
//! Every record is a plain value rebuilt on each poll. They derive `Serialize`
//! so a presentation layer can ship them wherever it likes.

mod network;
mod process;
mod system;

pub use network::{
    ConnectionRecord, InterfaceKind, InterfaceRate, ListeningPort, NetDevCounters,
    NetworkInterfaceRecord, Protocol, TcpState,
};
pub use process::{ProcessCounts, ProcessRecord, ProcessState, StateCategory};
pub use system::{
    CpuSample, DiskRecord, FanRecord, HostInfo, LoadAverage, MemoryRecord, Provenance, Reading,
    SensorRecord, percent,
};
