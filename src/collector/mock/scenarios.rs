//! Pre-built mock host states for testing.
//!
//! Every scenario lays its files out under `/proc` and `/sys`, so collectors
//! are built with the default roots.

use super::filesystem::{MockFs, MockHost};
use std::net::Ipv4Addr;

/// Builds a `/proc/[pid]/stat` line with the fields the sampler reads filled
/// in and the rest zeroed.
#[allow(clippy::too_many_arguments)]
pub fn stat_line(
    pid: u32,
    comm: &str,
    state: char,
    ppid: u32,
    utime: u64,
    stime: u64,
    nice: i32,
    vsize: u64,
) -> String {
    format!(
        "{pid} ({comm}) {state} {ppid} {pid} {pid} 0 -1 4194304 0 0 0 0 {utime} {stime} 0 0 {prio} {nice} 1 0 1000 {vsize} 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
        prio = 20 + nice,
    )
}

/// Builds a minimal `/proc/[pid]/status` with a `VmRSS` line.
pub fn status_with_rss(name: &str, rss_kb: u64) -> String {
    format!(
        "Name:\t{name}\nUmask:\t0022\nState:\tS (sleeping)\nVmPeak:\t  {peak} kB\nVmRSS:\t  {rss_kb} kB\nThreads:\t1\n",
        peak = rss_kb * 2,
    )
}

#[allow(dead_code)]
impl MockFs {
    /// A small desktop: init, a shell, an nginx master with one worker, an
    /// orphaned job, hwmon sensors and two network interfaces.
    pub fn typical_system() -> Self {
        let fs = Self::new();

        fs.add_file("/proc/uptime", "12345.67 98765.43\n");
        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file("/proc/sys/kernel/hostname", "testhost\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        3072000 kB
Dirty:              1024 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );
        fs.add_file(
            "/proc/cpuinfo",
            "\
processor\t: 0
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz
cpu MHz\t\t: 1992.000

processor\t: 1
vendor_id\t: GenuineIntel
model name\t: Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz
",
        );
        fs.add_file(
            "/proc/mounts",
            "\
sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
udev /dev devtmpfs rw,nosuid,relatime,size=8000000k 0 0
tmpfs /run tmpfs rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
/dev/nvme0n1p1 /boot/efi vfat rw,relatime 0 0
/dev/nvme0n1p2 /var/snap ext4 rw,relatime 0 0
/dev/loop0 /snap/core/1 squashfs ro,nodev,relatime 0 0
tmpfs /dev/shm tmpfs rw,nosuid,nodev 0 0
overlay /var/lib/docker/overlay2/abc/merged overlay rw,relatime 0 0
",
        );
        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
wlan0:        0        0    0    0    0     0          0         0        0        0    0    0    0     0       0          0
",
        );
        fs.add_file(
            "/proc/net/tcp",
            "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 2001 1 0000000000000000 100 0 0 10 0
   1: 0100007F:0277 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 2002 1 0000000000000000 100 0 0 10 0
   2: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 2003 1 0000000000000000 100 0 0 10 0
   3: 0200000A:D431 22D8B85D:01BB 01 00000000:00000000 02:000A7D8C 00000000  1000        0 2004 2 0000000000000000 20 4 30 10 -1
   4: 0200000A:0016 0100000A:C350 01 00000000:00000000 02:000A7D8C 00000000     0        0 2005 2 0000000000000000 20 4 30 10 -1
   5: 0200000A:D432 22D8B85D:01BB 06 00000000:00000000 03:00001234 00000000     0        0 0 3 0000000000000000
   6: 0100007F:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 2006 1 0000000000000000 100 0 0 10 0
",
        );

        fs.add_process(
            1,
            &stat_line(1, "systemd", 'S', 0, 500, 300, 0, 170_000_000),
            &status_with_rss("systemd", 12_000),
            "systemd\n",
        );
        fs.add_process(
            2,
            &stat_line(2, "kthreadd", 'S', 0, 0, 10, 0, 0),
            "Name:\tkthreadd\nState:\tS (sleeping)\nThreads:\t1\n",
            "kthreadd\n",
        );
        fs.add_process(
            100,
            &stat_line(100, "bash", 'S', 1, 120, 40, 0, 25_000_000),
            &status_with_rss("bash", 8_000),
            "bash\n",
        );
        fs.add_process(
            200,
            &stat_line(200, "nginx", 'S', 1, 2_000, 800, 0, 60_000_000),
            &status_with_rss("nginx", 16_384),
            "nginx\n",
        );
        fs.add_process(
            201,
            &stat_line(201, "nginx", 'R', 200, 9_000, 1_000, 5, 62_000_000),
            &status_with_rss("nginx", 32_768),
            "nginx\n",
        );
        fs.add_process(
            300,
            &stat_line(300, "backup.sh", 'D', 9999, 50, 50, 10, 10_000_000),
            &status_with_rss("backup.sh", 4_096),
            "backup.sh\n",
        );

        fs.add_file("/sys/class/net/lo/address", "00:00:00:00:00:00\n");
        fs.add_file("/sys/class/net/lo/operstate", "unknown\n");
        fs.add_file("/sys/class/net/lo/type", "772\n");
        fs.add_file("/sys/class/net/eth0/address", "52:54:00:12:34:56\n");
        fs.add_file("/sys/class/net/eth0/operstate", "up\n");
        fs.add_file("/sys/class/net/eth0/type", "1\n");

        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "45000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/name", "thinkpad\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "47000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/fan1_input", "2600\n");
        fs.add_file("/sys/class/hwmon/hwmon0/pwm1", "128\n");
        fs.add_file("/sys/class/hwmon/hwmon0/pwm1_enable", "2\n");

        fs
    }

    /// A VM without any hwmon or thermal sources.
    pub fn without_sensors() -> Self {
        let fs = Self::typical_system();
        fs.remove("/sys/class/hwmon");
        fs.remove("/sys/class/thermal");
        fs
    }

    /// Sensors exist but the fan reports a stopped state.
    pub fn with_idle_fan() -> Self {
        let fs = Self::typical_system();
        fs.remove("/sys/class/hwmon/hwmon0");
        fs.add_file("/sys/class/hwmon/hwmon0/name", "acpi_fan\n");
        fs.add_file("/sys/class/hwmon/hwmon0/fan1_input", "0\n");
        fs.add_file("/sys/class/hwmon/hwmon0/fan1_enable", "0\n");
        fs.add_file("/sys/class/hwmon/hwmon0/pwm1_enable", "0\n");
        fs
    }

    /// Adds a zombie child of the shell.
    pub fn with_zombie_process() -> Self {
        let fs = Self::typical_system();
        fs.add_process(
            400,
            &stat_line(400, "defunct", 'Z', 100, 0, 0, 0, 0),
            "Name:\tdefunct\nState:\tZ (zombie)\n",
            "defunct\n",
        );
        fs
    }

    /// Processes whose names contain spaces and parentheses, one of them
    /// without a readable `comm` file.
    pub fn with_special_names() -> Self {
        let fs = Self::typical_system();
        fs.add_process(
            5000,
            &stat_line(5000, "Web Content", 'S', 1, 5_000, 1_000, 0, 2_000_000_000),
            &status_with_rss("Web Content", 200_000),
            "Web Content\n",
        );
        fs.add_process(
            5001,
            &stat_line(5001, "test(1)", 'S', 1, 10, 5, 0, 10_000_000),
            &status_with_rss("test(1)", 4_000),
            "",
        );
        fs.add_process(
            5002,
            &stat_line(5002, "evil) R (1", 'S', 5001, 1, 1, 0, 1_000_000),
            &status_with_rss("evil) R (1", 100),
            "",
        );
        fs
    }

    /// Only virtual filesystems are mounted.
    pub fn without_physical_mounts() -> Self {
        let fs = Self::typical_system();
        fs.add_file(
            "/proc/mounts",
            "\
sysfs /sys sysfs rw 0 0
proc /proc proc rw 0 0
tmpfs /run tmpfs rw 0 0
overlay / overlay rw 0 0
",
        );
        fs
    }
}

#[allow(dead_code)]
impl MockHost {
    /// statvfs and address answers matching `MockFs::typical_system`.
    pub fn typical_host() -> Self {
        let host = Self::new();
        // 100 GiB root, 40 GiB bfree, 35 GiB available to users.
        host.add_simple_mount("/", 26_214_400, 10_485_760, 9_175_040);
        host.add_simple_mount("/boot/efi", 131_072, 100_000, 100_000);
        host.add_simple_mount("/var/snap", 26_214_400, 10_485_760, 9_175_040);
        host.add_simple_mount("/snap/core/1", 0, 0, 0);

        host.add_address("lo", Ipv4Addr::LOCALHOST, None, true);
        host.add_address(
            "eth0",
            Ipv4Addr::new(10, 0, 0, 2),
            Some([0x52, 0x54, 0x00, 0x12, 0x34, 0x56]),
            true,
        );
        host.add_address(
            "docker0",
            Ipv4Addr::new(172, 17, 0, 1),
            Some([0x02, 0x42, 0xac, 0x11, 0x00, 0x01]),
            false,
        );
        host.add_address("wg0", Ipv4Addr::new(10, 8, 0, 3), None, true);
        host
    }
}
