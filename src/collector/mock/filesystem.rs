//! In-memory host for testing collectors without real `/proc` and `/sys`.

use crate::collector::traits::{FileSystem, FsStats, HostApi, InterfaceAddress};
use std::collections::{HashMap, HashSet};
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tree {
    files: HashMap<PathBuf, String>,
    directories: HashSet<PathBuf>,
}

impl Tree {
    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

/// In-memory filesystem for testing.
///
/// Files and directories live in maps, so tests can lay out any `/proc` or
/// `/sys` state (including broken ones). Clones share the same tree: a test
/// keeps one handle and mutates what a running `Sampler` sees between polls.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    tree: Arc<RwLock<Tree>>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(|e| e.into_inner())
    }

    /// True when `path` was added as a file or directory.
    pub fn exists(&self, path: &Path) -> bool {
        let tree = self.read();
        tree.files.contains_key(path) || tree.directories.contains(path)
    }

    /// Adds a file with the given content. Parent directories are created.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        let mut tree = self.write();
        tree.add_parents(&path);
        tree.files.insert(path, content.into());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut tree = self.write();
        tree.add_parents(&path);
        tree.directories.insert(path);
    }

    /// Removes a file, or a directory together with everything below it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut tree = self.write();
        tree.files.retain(|p, _| !p.starts_with(path));
        tree.directories.retain(|p| !p.starts_with(path));
    }

    /// Adds a process with the `/proc/[pid]/` files the sampler reads.
    ///
    /// An empty `comm` leaves the file out, forcing the stat fallback.
    pub fn add_process(&self, pid: u32, stat: &str, status: &str, comm: &str) {
        let base = PathBuf::from(format!("/proc/{}", pid));
        self.add_dir(&base);
        self.add_file(base.join("stat"), stat);
        self.add_file(base.join("status"), status);
        if !comm.is_empty() {
            self.add_file(base.join("comm"), comm);
        }
    }

    /// Replaces the CPU counters of an existing process, keeping the rest of
    /// its stat line.
    pub fn set_process_times(&self, pid: u32, utime: u64, stime: u64) {
        let path = PathBuf::from(format!("/proc/{}/stat", pid));
        let mut tree = self.write();
        let Some(stat) = tree.files.get(&path) else {
            return;
        };
        let Some(close) = stat.rfind(')') else {
            return;
        };
        let (head, tail) = stat.split_at(close + 1);
        let mut fields: Vec<String> = tail.split_whitespace().map(str::to_string).collect();
        if fields.len() > 12 {
            fields[11] = utime.to_string();
            fields[12] = stime.to_string();
        }
        let updated = format!("{} {}", head, fields.join(" "));
        tree.files.insert(path, updated);
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.read().files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let tree = self.read();
        if !tree.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        for file_path in tree.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &tree.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        let mut entries: Vec<PathBuf> = entries.into_iter().collect();
        entries.sort();
        Ok(entries)
    }
}

/// Scripted statvfs and getifaddrs results.
///
/// Clones share state, like `MockFs`.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    fs_stats: Arc<Mutex<HashMap<PathBuf, FsStats>>>,
    addresses: Arc<Mutex<Option<Vec<InterfaceAddress>>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mounted filesystem with the given block geometry.
    pub fn add_mount(&self, path: impl AsRef<Path>, stats: FsStats) {
        self.fs_stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.as_ref().to_path_buf(), stats);
    }

    /// Convenience for a filesystem with 4 KiB fragments.
    pub fn add_simple_mount(&self, path: impl AsRef<Path>, blocks: u64, free: u64, avail: u64) {
        self.add_mount(
            path,
            FsStats {
                blocks,
                blocks_free: free,
                blocks_available: avail,
                fragment_size: 4096,
            },
        );
    }

    pub fn add_address(&self, name: &str, ipv4: Ipv4Addr, mac: Option<[u8; 6]>, up: bool) {
        self.addresses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_or_insert_with(Vec::new)
            .push(InterfaceAddress {
                name: name.to_string(),
                ipv4,
                mac,
                flag_up: up,
                flag_running: up,
            });
    }
}

impl HostApi for MockHost {
    fn fs_stats(&self, path: &Path) -> io::Result<FsStats> {
        let map = self.fs_stats.lock().unwrap_or_else(|e| e.into_inner());
        map.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no filesystem at {:?}", path),
            )
        })
    }

    fn interface_addresses(&self) -> io::Result<Vec<InterfaceAddress>> {
        let guard = self.addresses.lock().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "address enumeration failed")
        })
    }
}
