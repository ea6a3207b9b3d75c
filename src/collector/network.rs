//! Network interfaces, traffic counters and TCP sockets.

use crate::collector::procfs::parser::{parse_net_dev, parse_sysfs_int, parse_tcp_table};
use crate::collector::traits::{FileSystem, HostApi, InterfaceAddress};
use crate::model::{
    ConnectionRecord, InterfaceKind, ListeningPort, NetDevCounters, NetworkInterfaceRecord,
    TcpState,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Name prefixes, checked in order. The first match wins.
const NAME_RULES: &[(&[&str], InterfaceKind)] = &[
    (&["lo"], InterfaceKind::Loopback),
    (&["wlan", "wl"], InterfaceKind::Wireless),
    (&["eth", "en"], InterfaceKind::Ethernet),
    (&["tun", "tap", "wg", "ppp"], InterfaceKind::Vpn),
    (&["docker", "veth"], InterfaceKind::Docker),
    (&["virbr", "br"], InterfaceKind::Bridge),
];

/// ARPHRD_* values from `/sys/class/net/<if>/type`.
const ARPHRD_RULES: &[(i64, InterfaceKind)] = &[
    (1, InterfaceKind::Ethernet),
    (772, InterfaceKind::Loopback),
    (801, InterfaceKind::Wireless),
    (65534, InterfaceKind::Vpn),
];

/// Classifies an interface by its name alone.
pub fn classify_interface_name(name: &str) -> InterfaceKind {
    NAME_RULES
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| name.starts_with(p)))
        .map(|(_, kind)| *kind)
        .unwrap_or(InterfaceKind::Unknown)
}

/// Classifies by the kernel's hardware type number.
pub fn classify_arphrd(hw_type: i64) -> InterfaceKind {
    ARPHRD_RULES
        .iter()
        .find(|(code, _)| *code == hw_type)
        .map(|(_, kind)| *kind)
        .unwrap_or(InterfaceKind::Unknown)
}

pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

pub struct NetworkCollector<F: FileSystem, H: HostApi> {
    fs: F,
    host: H,
    proc_path: String,
    sys_path: String,
}

impl<F: FileSystem, H: HostApi> NetworkCollector<F, H> {
    /// # Arguments
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    pub fn new(fs: F, host: H, proc_path: impl Into<String>, sys_path: impl Into<String>) -> Self {
        Self {
            fs,
            host,
            proc_path: proc_path.into(),
            sys_path: sys_path.into(),
        }
    }

    fn read_sysfs(&self, iface: &str, attr: &str) -> Option<String> {
        let path = format!("{}/class/net/{}/{}", self.sys_path, iface, attr);
        self.fs
            .read_to_string(Path::new(&path))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// All interfaces with an IPv4 address, one record per address.
    pub fn collect_interfaces(&self) -> Vec<NetworkInterfaceRecord> {
        let addresses = match self.host.interface_addresses() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(error = %e, "interface enumeration failed");
                return Vec::new();
            }
        };

        addresses
            .iter()
            .map(|addr| self.interface_record(addr))
            .collect()
    }

    fn interface_record(&self, addr: &InterfaceAddress) -> NetworkInterfaceRecord {
        let mac = self
            .read_sysfs(&addr.name, "address")
            .or_else(|| addr.mac.as_ref().map(format_mac))
            .unwrap_or_default();

        // "unknown" (loopback, some tunnels) defers to the flags.
        let is_up = match self.read_sysfs(&addr.name, "operstate").as_deref() {
            Some("up") => true,
            Some("down" | "lowerlayerdown" | "notpresent" | "dormant") => false,
            _ => addr.flag_up && addr.flag_running,
        };

        let kind = match classify_interface_name(&addr.name) {
            InterfaceKind::Unknown => self
                .read_sysfs(&addr.name, "type")
                .and_then(|t| parse_sysfs_int(&t).ok())
                .map(classify_arphrd)
                .unwrap_or(InterfaceKind::Unknown),
            kind => kind,
        };

        NetworkInterfaceRecord {
            name: addr.name.clone(),
            kind,
            is_up,
            ipv4: addr.ipv4,
            mac,
        }
    }

    /// Per-interface traffic counters from `/proc/net/dev`.
    pub fn collect_counters(&self) -> Vec<NetDevCounters> {
        let path = format!("{}/net/dev", self.proc_path);
        match self.fs.read_to_string(Path::new(&path)) {
            Ok(content) => parse_net_dev(&content),
            Err(e) => {
                debug!(path = %path, error = %e, "interface counters unavailable");
                Vec::new()
            }
        }
    }

    /// IPv4 TCP sockets from `/proc/net/tcp`.
    pub fn collect_connections(&self) -> Vec<ConnectionRecord> {
        let path = format!("{}/net/tcp", self.proc_path);
        match self.fs.read_to_string(Path::new(&path)) {
            Ok(content) => parse_tcp_table(&content),
            Err(e) => {
                debug!(path = %path, error = %e, "tcp table unavailable");
                Vec::new()
            }
        }
    }

    /// Distinct local ports in LISTEN state, ascending.
    pub fn collect_listening_ports(&self) -> Vec<ListeningPort> {
        listening_ports(&self.collect_connections())
    }
}

pub fn listening_ports(connections: &[ConnectionRecord]) -> Vec<ListeningPort> {
    let mut ports = BTreeMap::new();
    for conn in connections.iter().filter(|c| c.state == TcpState::Listen) {
        ports.entry(conn.local.port()).or_insert(ListeningPort {
            port: conn.local.port(),
            protocol: conn.protocol,
            state: conn.state,
        });
    }
    ports.into_values().collect()
}
