//! Abstractions over the host so collectors can run against mocks.
//!
//! `FileSystem` covers the text sources under `/proc` and `/sys`. `HostApi`
//! covers the two queries that are not file reads: filesystem statistics
//! (statvfs) and address enumeration (getifaddrs).

use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Abstraction for filesystem operations.
///
/// This trait allows collectors to read from the real filesystem or from
/// a mock implementation for testing purposes.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Lists entries in a directory.
    ///
    /// # Returns
    /// A vector of paths to entries in the directory, or an I/O error.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

/// Block counts for one mounted filesystem, as returned by statvfs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsStats {
    pub blocks: u64,
    pub blocks_free: u64,
    /// Free blocks available to unprivileged users.
    pub blocks_available: u64,
    pub fragment_size: u64,
}

/// One IPv4 address assignment, merged with the link-layer data of the same
/// interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub ipv4: Ipv4Addr,
    /// Hardware address from the AF_PACKET entry, if the kernel exposed one.
    pub mac: Option<[u8; 6]>,
    pub flag_up: bool,
    pub flag_running: bool,
}

/// Host queries that are not plain file reads.
pub trait HostApi: Send + Sync {
    /// statvfs(2) on a mount point.
    fn fs_stats(&self, path: &Path) -> io::Result<FsStats>;

    /// All IPv4 addresses currently assigned, one entry per address.
    fn interface_addresses(&self) -> io::Result<Vec<InterfaceAddress>>;
}

/// `HostApi` backed by libc through `nix`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealHost;

impl RealHost {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
impl HostApi for RealHost {
    fn fs_stats(&self, path: &Path) -> io::Result<FsStats> {
        let st = nix::sys::statvfs::statvfs(path)?;
        Ok(FsStats {
            blocks: st.blocks() as u64,
            blocks_free: st.blocks_free() as u64,
            blocks_available: st.blocks_available() as u64,
            fragment_size: st.fragment_size() as u64,
        })
    }

    fn interface_addresses(&self) -> io::Result<Vec<InterfaceAddress>> {
        use nix::net::if_::InterfaceFlags;
        use std::collections::HashMap;
        use std::net::SocketAddrV4;

        let mut macs: HashMap<String, [u8; 6]> = HashMap::new();
        let mut addrs = Vec::new();

        for ifa in nix::ifaddrs::getifaddrs()? {
            let Some(address) = ifa.address else {
                continue;
            };
            if let Some(link) = address.as_link_addr() {
                if let Some(mac) = link.addr() {
                    macs.insert(ifa.interface_name.clone(), mac);
                }
            } else if let Some(sin) = address.as_sockaddr_in() {
                addrs.push(InterfaceAddress {
                    name: ifa.interface_name.clone(),
                    ipv4: *SocketAddrV4::from(*sin).ip(),
                    mac: None,
                    flag_up: ifa.flags.contains(InterfaceFlags::IFF_UP),
                    flag_running: ifa.flags.contains(InterfaceFlags::IFF_RUNNING),
                });
            }
        }

        for addr in &mut addrs {
            addr.mac = macs.get(&addr.name).copied();
        }
        Ok(addrs)
    }
}

#[cfg(not(target_os = "linux"))]
impl HostApi for RealHost {
    fn fs_stats(&self, _path: &Path) -> io::Result<FsStats> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "statvfs is only wired up on Linux",
        ))
    }

    fn interface_addresses(&self) -> io::Result<Vec<InterfaceAddress>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "getifaddrs is only wired up on Linux",
        ))
    }
}
