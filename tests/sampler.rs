//! End-to-end sampling against mock hosts, mutating counters between polls.

use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use hostpulse::alerts::AlertKind;
use hostpulse::collector::{MockFs, MockHost};
use hostpulse::model::{InterfaceKind, ProcessState, Provenance};
use hostpulse::sampler::Sampler;
use hostpulse::scheduler::{Domain, SamplerConfig};

const NET_DEV_HEADER: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
";

fn net_dev(eth0_rx: u64, eth0_tx: u64) -> String {
    format!(
        "{NET_DEV_HEADER}    lo: 12345678 9876 0 0 0 0 0 0 12345678 9876 0 0 0 0 0 0\n  eth0: {eth0_rx} 654321 0 0 0 0 0 0 {eth0_tx} 456789 0 0 0 0 0 0\n"
    )
}

fn sampler(fs: &MockFs) -> Sampler<MockFs, MockHost> {
    Sampler::new(fs.clone(), MockHost::typical_host(), SamplerConfig::default())
}

#[test]
fn cpu_and_process_shares_from_two_polls() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    let t0 = Instant::now();
    s.poll(t0);
    assert_eq!(s.report().cpu_usage, 0.0);

    // 1000 jiffies elapse: 300 user, 200 system, 500 idle.
    fs.add_file(
        "/proc/stat",
        "cpu  10300 500 3200 80500 1000 200 100 0 0 0\ncpu0 0 0 0 0 0 0 0 0 0 0\n",
    );
    // The nginx worker burns 100 of them.
    fs.set_process_times(201, 9_080, 1_020);

    let ran = s.poll(t0 + Duration::from_secs(1));
    assert_eq!(ran, vec![Domain::Cpu, Domain::Processes, Domain::Memory]);

    let report = s.report();
    assert!((report.cpu_usage - 50.0).abs() < 0.01);
    let worker = report.processes.iter().find(|p| p.pid == 201).unwrap();
    assert!((worker.cpu_usage - 10.0).abs() < 0.01);
    let shell = report.processes.iter().find(|p| p.pid == 100).unwrap();
    assert_eq!(shell.cpu_usage, 0.0);
    assert_eq!(s.histories().cpu_usage.values(), vec![0.0, report.cpu_usage]);
}

#[test]
fn counter_reset_yields_zero_not_negative() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    let t0 = Instant::now();
    s.poll(t0);

    fs.add_file("/proc/stat", "cpu  10 0 10 100 0 0 0 0 0 0\n");
    fs.set_process_times(201, 1, 1);
    s.poll(t0 + Duration::from_secs(1));

    let report = s.report();
    assert_eq!(report.cpu_usage, 0.0);
    assert!(report.processes.iter().all(|p| p.cpu_usage == 0.0));
}

#[test]
fn reused_pid_reads_zero_while_others_keep_their_share() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    let t0 = Instant::now();
    s.poll(t0);

    fs.add_file(
        "/proc/stat",
        "cpu  10300 500 3200 80500 1000 200 100 0 0 0\ncpu0 0 0 0 0 0 0 0 0 0 0\n",
    );
    fs.set_process_times(201, 9_080, 1_020);
    // pid 100 was recycled: its counters restart near zero.
    fs.set_process_times(100, 2, 1);
    s.poll(t0 + Duration::from_secs(1));

    let report = s.report();
    let worker = report.processes.iter().find(|p| p.pid == 201).unwrap();
    assert!((worker.cpu_usage - 10.0).abs() < 0.01);
    let recycled = report.processes.iter().find(|p| p.pid == 100).unwrap();
    assert_eq!(recycled.cpu_usage, 0.0);
}

#[test]
fn interface_throughput_over_interval() {
    let fs = MockFs::typical_system();
    fs.add_file("/proc/net/dev", net_dev(1_000_000, 500_000));
    let mut s = sampler(&fs);

    let t0 = Instant::now();
    let wall = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    s.poll_at(t0, wall);
    assert!(
        s.report()
            .interface_rates
            .iter()
            .all(|r| r.rx_bytes_per_sec.is_none() && r.tx_bytes_per_sec.is_none())
    );

    // The first interval only primes the baseline.
    fs.add_file("/proc/net/dev", net_dev(1_050_000, 510_000));
    let ran = s.poll_at(
        t0 + Duration::from_secs(5),
        wall + chrono::Duration::seconds(5),
    );
    assert!(ran.contains(&Domain::Interfaces));
    assert!(
        s.report()
            .interface_rates
            .iter()
            .all(|r| r.rx_bytes_per_sec.is_none())
    );
    assert_eq!(s.histories().rx_rate.latest(), None);

    fs.add_file("/proc/net/dev", net_dev(1_100_000, 520_000));
    s.poll_at(
        t0 + Duration::from_secs(10),
        wall + chrono::Duration::seconds(10),
    );

    let eth0 = s
        .report()
        .interface_rates
        .iter()
        .find(|r| r.interface == "eth0")
        .unwrap();
    assert_eq!(eth0.rx_bytes_per_sec, Some(10_000.0));
    assert_eq!(eth0.tx_bytes_per_sec, Some(2_000.0));

    // Loopback traffic is left out of the history totals.
    assert_eq!(s.histories().rx_rate.latest(), Some(10_000.0));
    assert_eq!(s.histories().tx_rate.latest(), Some(2_000.0));
}

#[test]
fn vanished_interface_is_forgotten() {
    let fs = MockFs::typical_system();
    fs.add_file("/proc/net/dev", net_dev(1_000_000, 500_000));
    let mut s = sampler(&fs);
    let t0 = Instant::now();
    let wall = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
    s.poll_at(t0, wall);

    fs.add_file(
        "/proc/net/dev",
        format!("{NET_DEV_HEADER}    lo: 12345678 9876 0 0 0 0 0 0 12345678 9876 0 0 0 0 0 0\n"),
    );
    s.poll_at(t0 + Duration::from_secs(5), wall + chrono::Duration::seconds(5));
    assert_eq!(s.report().interface_rates.len(), 1);

    // Coming back starts from a cold sample.
    fs.add_file("/proc/net/dev", net_dev(2_000_000, 600_000));
    s.poll_at(t0 + Duration::from_secs(10), wall + chrono::Duration::seconds(10));
    let eth0 = s
        .report()
        .interface_rates
        .iter()
        .find(|r| r.interface == "eth0")
        .unwrap();
    assert_eq!(eth0.rx_bytes_per_sec, None);
}

#[test]
fn processes_come_and_go_between_polls() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    let t0 = Instant::now();
    s.poll(t0);

    fs.remove("/proc/300");
    fs.add_process(
        400,
        &hostpulse::collector::mock::stat_line(400, "defunct", 'Z', 100, 0, 0, 0, 0),
        "Name:\tdefunct\nState:\tZ (zombie)\n",
        "defunct\n",
    );
    s.poll(t0 + Duration::from_secs(1));

    let report = s.report();
    let pids: Vec<u32> = report.processes.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![1, 2, 100, 200, 201, 400]);
    assert_eq!(report.process_counts.zombie, 1);
    let zombie = report.processes.iter().find(|p| p.pid == 400).unwrap();
    assert_eq!(zombie.state, ProcessState::Zombie);
    assert_eq!(zombie.rss, 0);
    assert!(report.process_tree.iter().any(|r| r.pid == 400 && r.depth == 2));
}

#[test]
fn alert_fires_once_for_hot_process() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    s.alerts_mut().add(201, "nginx", 5.0, 90.0);

    let t0 = Instant::now();
    s.poll(t0);
    assert!(s.report().alert_events.is_empty());

    fs.add_file("/proc/stat", "cpu  10300 500 3200 80500 1000 200 100 0 0 0\n");
    fs.set_process_times(201, 9_080, 1_020);
    s.poll(t0 + Duration::from_secs(1));
    let events = &s.report().alert_events;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].pid, 201);
    assert_eq!(events[0].kind, AlertKind::Cpu);

    // Still hot on the next pass, but already reported.
    fs.add_file("/proc/stat", "cpu  10600 500 3400 81000 1000 200 100 0 0 0\n");
    fs.set_process_times(201, 9_160, 1_040);
    s.poll(t0 + Duration::from_secs(2));
    assert!(s.report().alert_events.is_empty());
    assert!(s.alerts().get(201).unwrap().cpu_active);
}

#[test]
fn missing_sensors_fall_back_to_estimates() {
    let fs = MockFs::without_sensors();
    let mut s = sampler(&fs);
    s.poll(Instant::now());

    let sensors = s.report().sensors.unwrap();
    assert_eq!(sensors.temperature_c, 0.0);
    assert_eq!(sensors.fan.speed_rpm.value, 1000);
    assert_eq!(sensors.fan.speed_rpm.provenance, Provenance::Estimated);
    assert_eq!(sensors.fan.level.provenance, Provenance::Estimated);
    assert_eq!(sensors.fan.active.provenance, Provenance::Assumed);
}

#[test]
fn measured_sensors_on_typical_host() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    s.poll(Instant::now());

    let sensors = s.report().sensors.unwrap();
    assert_eq!(sensors.temperature_c, 45.0);
    assert!(sensors.fan.speed_rpm.is_measured());
    assert_eq!(sensors.fan.speed_rpm.value, 2600);
    assert_eq!(sensors.fan.level.value, 128);
    assert_eq!(s.histories().temperature.latest(), Some(45.0));
}

#[test]
fn catalogs_on_first_poll() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    s.poll(Instant::now());
    let report = s.report();

    let mounts: Vec<&str> = report.disks.iter().map(|d| d.mount_point.as_str()).collect();
    assert_eq!(mounts, vec!["/", "/boot/efi"]);

    let kinds: Vec<(&str, InterfaceKind)> = report
        .interfaces
        .iter()
        .map(|i| (i.name.as_str(), i.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("lo", InterfaceKind::Loopback),
            ("eth0", InterfaceKind::Ethernet),
            ("docker0", InterfaceKind::Docker),
            ("wg0", InterfaceKind::Vpn),
        ]
    );

    let ports: Vec<u16> = report.listening_ports.iter().map(|p| p.port).collect();
    assert_eq!(ports, vec![22, 80, 631]);
}

#[test]
fn no_physical_mounts_falls_back_to_root() {
    let fs = MockFs::without_physical_mounts();
    let mut s = sampler(&fs);
    s.poll(Instant::now());

    let disks = &s.report().disks;
    assert_eq!(disks.len(), 1);
    assert_eq!(disks[0].mount_point, "/");
}

#[test]
fn forced_domain_refreshes_early() {
    let fs = MockFs::typical_system();
    let mut s = sampler(&fs);
    let t0 = Instant::now();
    s.poll(t0);
    assert_eq!(s.report().disks.len(), 2);

    fs.add_file("/proc/mounts", "/dev/sda1 / ext4 rw 0 0\n");
    assert!(!s.poll(t0 + Duration::from_millis(500)).contains(&Domain::Disks));
    assert_eq!(s.report().disks.len(), 2);

    s.force(Domain::Disks);
    let ran = s.poll(t0 + Duration::from_millis(500));
    assert_eq!(ran, vec![Domain::Disks]);
    assert_eq!(s.report().disks.len(), 1);
}

#[test]
fn empty_proc_root_keeps_cycle_alive() {
    let fs = MockFs::new();
    let host = MockHost::new();
    let mut s = Sampler::new(fs, host, SamplerConfig::default());

    let ran = s.poll(Instant::now());
    assert_eq!(ran, Domain::ALL.to_vec());
    let report = s.report();
    assert!(report.processes.is_empty());
    assert!(report.interfaces.is_empty());
    assert!(report.connections.is_empty());
    assert_eq!(report.cpu_usage, 0.0);
    assert_eq!(report.memory.total_ram, 0);
}
