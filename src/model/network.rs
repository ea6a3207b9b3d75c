//! Network records: interfaces, counters, rates and TCP sockets.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddrV4};

/// Coarse interface classification.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    Ethernet,
    Wireless,
    Loopback,
    Vpn,
    Bridge,
    Docker,
    Unknown,
}

impl InterfaceKind {
    pub fn label(&self) -> &'static str {
        match self {
            InterfaceKind::Ethernet => "Ethernet",
            InterfaceKind::Wireless => "Wireless",
            InterfaceKind::Loopback => "Loopback",
            InterfaceKind::Vpn => "VPN",
            InterfaceKind::Bridge => "Bridge",
            InterfaceKind::Docker => "Docker",
            InterfaceKind::Unknown => "Unknown",
        }
    }
}

/// An IPv4-bearing network interface.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct NetworkInterfaceRecord {
    pub name: String,
    pub kind: InterfaceKind,
    pub is_up: bool,
    pub ipv4: Ipv4Addr,
    /// `aa:bb:cc:dd:ee:ff`, or empty when unknown.
    pub mac: String,
}

/// Raw counters for one interface from `/proc/net/dev`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct NetDevCounters {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub rx_fifo: u64,
    pub rx_frame: u64,
    pub rx_compressed: u64,
    pub rx_multicast: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
    pub tx_fifo: u64,
    pub tx_colls: u64,
    pub tx_carrier: u64,
    pub tx_compressed: u64,
}

/// Throughput of one interface over the last interval.
///
/// A direction is `None` on the first sample after (re)start or after a
/// counter reset.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct InterfaceRate {
    pub interface: String,
    pub rx_bytes_per_sec: Option<f64>,
    pub tx_bytes_per_sec: Option<f64>,
}

/// TCP socket states as numbered in `include/net/tcp_states.h`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum TcpState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    Unknown,
}

impl TcpState {
    const TABLE: [TcpState; 11] = [
        TcpState::Established,
        TcpState::SynSent,
        TcpState::SynRecv,
        TcpState::FinWait1,
        TcpState::FinWait2,
        TcpState::TimeWait,
        TcpState::Close,
        TcpState::CloseWait,
        TcpState::LastAck,
        TcpState::Listen,
        TcpState::Closing,
    ];

    /// Maps the kernel's 1-based state number. Out of range is `Unknown`.
    pub fn from_code(code: u8) -> Self {
        (code as usize)
            .checked_sub(1)
            .and_then(|idx| Self::TABLE.get(idx).copied())
            .unwrap_or(TcpState::Unknown)
    }

    /// Decodes the hex `st` column of `/proc/net/tcp`.
    pub fn from_hex(hex: &str) -> Self {
        u8::from_str_radix(hex.trim(), 16)
            .map(Self::from_code)
            .unwrap_or(TcpState::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TcpState::Established => "ESTABLISHED",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynRecv => "SYN_RECV",
            TcpState::FinWait1 => "FIN_WAIT1",
            TcpState::FinWait2 => "FIN_WAIT2",
            TcpState::TimeWait => "TIME_WAIT",
            TcpState::Close => "CLOSE",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::LastAck => "LAST_ACK",
            TcpState::Listen => "LISTEN",
            TcpState::Closing => "CLOSING",
            TcpState::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
}

impl Protocol {
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
        }
    }
}

/// One socket from the TCP table.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub protocol: Protocol,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub state: TcpState,
}

/// A local port in LISTEN state.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ListeningPort {
    pub port: u16,
    pub protocol: Protocol,
    pub state: TcpState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_state_decode() {
        assert_eq!(TcpState::from_hex("0A"), TcpState::Listen);
        assert_eq!(TcpState::from_hex("06"), TcpState::TimeWait);
        assert_eq!(TcpState::from_hex("01"), TcpState::Established);
        assert_eq!(TcpState::from_hex("0B"), TcpState::Closing);
    }

    #[test]
    fn test_tcp_state_out_of_range() {
        assert_eq!(TcpState::from_hex("00"), TcpState::Unknown);
        assert_eq!(TcpState::from_hex("0C"), TcpState::Unknown);
        assert_eq!(TcpState::from_hex("FF"), TcpState::Unknown);
        assert_eq!(TcpState::from_hex("zz"), TcpState::Unknown);
    }

    #[test]
    fn test_labels() {
        assert_eq!(TcpState::Listen.label(), "LISTEN");
        assert_eq!(InterfaceKind::Vpn.label(), "VPN");
        assert_eq!(Protocol::Tcp.label(), "TCP");
    }
}
