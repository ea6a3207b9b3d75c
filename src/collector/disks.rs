//! Mounted block-device capacity from `/proc/mounts` + statvfs.

use crate::collector::procfs::parser::{MountEntry, is_physical_mount, parse_mounts};
use crate::collector::traits::{FileSystem, FsStats, HostApi};
use crate::model::DiskRecord;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const ROOT_MOUNT: &str = "/";

pub struct DiskCollector<F: FileSystem, H: HostApi> {
    fs: F,
    host: H,
    proc_path: String,
}

impl<F: FileSystem, H: HostApi> DiskCollector<F, H> {
    pub fn new(fs: F, host: H, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            host,
            proc_path: proc_path.into(),
        }
    }

    /// One record per physical device, in mount-table order.
    ///
    /// When no physical device yields a record (unreadable mount table, no
    /// `/dev/` entries, or none of them stat), the root filesystem is
    /// reported on its own. Never fails; a host without
    /// statvfs yields an empty list.
    pub fn collect_disks(&self) -> Vec<DiskRecord> {
        let path = format!("{}/mounts", self.proc_path);
        let mounts = match self.fs.read_to_string(Path::new(&path)) {
            Ok(content) => parse_mounts(&content),
            Err(e) => {
                debug!(path = %path, error = %e, "mount table unavailable");
                Vec::new()
            }
        };

        let mut seen_devices = HashSet::new();
        let mut disks = Vec::new();

        for entry in mounts.iter().filter(|m| is_physical_mount(m)) {
            if seen_devices.contains(entry.device.as_str()) {
                continue;
            }
            // A device counts as seen only once one of its mounts stats.
            if let Some(disk) = self.stat_mount(entry) {
                seen_devices.insert(entry.device.as_str());
                disks.push(disk);
            }
        }

        if disks.is_empty() {
            let root = MountEntry {
                device: String::new(),
                mount_point: ROOT_MOUNT.to_string(),
                fs_type: String::new(),
            };
            disks.extend(self.stat_mount(&root));
        }

        disks
    }

    fn stat_mount(&self, entry: &MountEntry) -> Option<DiskRecord> {
        let stats = match self.host.fs_stats(Path::new(&entry.mount_point)) {
            Ok(stats) => stats,
            Err(e) => {
                debug!(mount = %entry.mount_point, error = %e, "statvfs failed");
                return None;
            }
        };
        disk_record(entry, stats)
    }
}

/// Converts block counts to bytes. Filesystems reporting no blocks are
/// dropped.
fn disk_record(entry: &MountEntry, stats: FsStats) -> Option<DiskRecord> {
    let total_bytes = stats.blocks.saturating_mul(stats.fragment_size);
    if total_bytes == 0 {
        return None;
    }
    Some(DiskRecord {
        mount_point: entry.mount_point.clone(),
        device: entry.device.clone(),
        total_bytes,
        free_bytes: stats.blocks_available.saturating_mul(stats.fragment_size),
        used_bytes: stats
            .blocks
            .saturating_sub(stats.blocks_free)
            .saturating_mul(stats.fragment_size),
    })
}
