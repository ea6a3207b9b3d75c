//! hostpulsed - live host telemetry daemon.
//!
//! Samples CPU, processes, memory, disks, network and sensors on their own
//! cadences and logs a summary line on every process refresh.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use hostpulse::collector::{RealFs, RealHost};
use hostpulse::fmt::{FmtStyle, format_bytes_rate, format_duration, format_percent, format_size};
use hostpulse::sampler::Sampler;
use hostpulse::scheduler::{Domain, SamplerConfig};

/// Live host telemetry daemon.
#[derive(Parser)]
#[command(name = "hostpulsed", about = "Live host telemetry daemon", version)]
struct Args {
    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, env = "HOSTPULSE_PROC_PATH", default_value = "/proc")]
    proc_path: String,

    /// Path to /sys filesystem.
    #[arg(long, env = "HOSTPULSE_SYS_PATH", default_value = "/sys")]
    sys_path: String,

    /// CPU, temperature and fan samples per second (1-60).
    #[arg(long, env = "HOSTPULSE_FPS", default_value = "30")]
    fps: f32,

    /// Process list refresh interval in seconds.
    #[arg(long, env = "HOSTPULSE_PROCESS_INTERVAL", default_value = "1", value_parser = parse_secs)]
    process_interval: Duration,

    /// Memory, load and uptime refresh interval in seconds.
    #[arg(long, env = "HOSTPULSE_MEMORY_INTERVAL", default_value = "1", value_parser = parse_secs)]
    memory_interval: Duration,

    /// Mounted disks refresh interval in seconds.
    #[arg(long, env = "HOSTPULSE_DISK_INTERVAL", default_value = "5", value_parser = parse_secs)]
    disk_interval: Duration,

    /// Network interfaces and throughput refresh interval in seconds.
    #[arg(long, env = "HOSTPULSE_INTERFACE_INTERVAL", default_value = "5", value_parser = parse_secs)]
    interface_interval: Duration,

    /// TCP connection table refresh interval in seconds.
    #[arg(long, env = "HOSTPULSE_CONNECTION_INTERVAL", default_value = "3", value_parser = parse_secs)]
    connection_interval: Duration,

    /// Listening ports refresh interval in seconds.
    #[arg(long, env = "HOSTPULSE_PORT_INTERVAL", default_value = "5", value_parser = parse_secs)]
    port_interval: Duration,

    /// Number of samples kept per history ring.
    #[arg(long, env = "HOSTPULSE_HISTORY", default_value = "100")]
    history: usize,

    /// Watch a process: PID:CPU%:MEM% (e.g. "1234:80:25"). Repeatable.
    #[arg(long = "alert", value_parser = parse_alert)]
    alerts: Vec<AlertSpec>,

    /// Stop after this many polls that refreshed something.
    #[arg(long, env = "HOSTPULSE_ITERATIONS")]
    iterations: Option<u64>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            proc_path: self.proc_path.clone(),
            sys_path: self.sys_path.clone(),
            fps: self.fps,
            process_interval: self.process_interval,
            memory_interval: self.memory_interval,
            disk_interval: self.disk_interval,
            interface_interval: self.interface_interval,
            connection_interval: self.connection_interval,
            port_interval: self.port_interval,
            history_capacity: self.history,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AlertSpec {
    pid: u32,
    cpu: f32,
    memory: f32,
}

/// Parses a positive number of seconds, fractions allowed ("0.5", "10").
fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid interval '{}': {}", s, e))?;
    if secs <= 0.0 {
        return Err(format!("interval must be positive, got '{}'", s));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid interval '{}': {}", s, e))
}

/// Parses "PID:CPU:MEM" with thresholds in percent.
fn parse_alert(s: &str) -> Result<AlertSpec, String> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    let [pid, cpu, memory] = parts.as_slice() else {
        return Err(format!("expected PID:CPU:MEM, got '{}'", s));
    };
    let pid = pid
        .parse::<u32>()
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| format!("invalid pid in '{}'", s))?;
    let cpu = cpu
        .parse::<f32>()
        .map_err(|e| format!("invalid cpu threshold in '{}': {}", s, e))?;
    let memory = memory
        .parse::<f32>()
        .map_err(|e| format!("invalid memory threshold in '{}': {}", s, e))?;
    Ok(AlertSpec { pid, cpu, memory })
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn log_summary<F, H>(sampler: &Sampler<F, H>)
where
    F: hostpulse::collector::FileSystem + Clone,
    H: hostpulse::collector::HostApi + Clone,
{
    let report = sampler.report();
    let histories = sampler.histories();
    let temp = report
        .sensors
        .map(|s| format!("{:.0}°C", s.temperature_c))
        .unwrap_or_else(|| "-".to_string());

    info!(
        "cpu {} | mem {}/{} | {} procs ({} running) | load {:.2} | {} | rx {} tx {} | up {}",
        format_percent(report.cpu_usage),
        format_size(report.memory.used_ram, FmtStyle::Compact),
        format_size(report.memory.total_ram, FmtStyle::Compact),
        report.process_counts.total(),
        report.process_counts.running,
        report.loadavg.one,
        temp,
        format_bytes_rate(histories.rx_rate.latest().map(f64::from), FmtStyle::Compact),
        format_bytes_rate(histories.tx_rate.latest().map(f64::from), FmtStyle::Compact),
        format_duration(report.uptime_secs as u64, FmtStyle::Compact),
    );
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = args.sampler_config();
    info!("hostpulsed {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: fps={}, proc={}, sys={}, processes={:?}, disks={:?}, interfaces={:?}",
        config.fps,
        config.proc_path,
        config.sys_path,
        config.process_interval,
        config.disk_interval,
        config.interface_interval
    );

    let mut sampler = Sampler::new(RealFs::new(), RealHost::new(), config);

    let host = &sampler.report().host;
    info!(
        "Host: {} ({}, {} cores, {}), user {}",
        host.hostname, host.cpu_model, host.cpu_cores, host.os_name, host.username
    );

    for alert in &args.alerts {
        sampler
            .alerts_mut()
            .add(alert.pid, format!("pid {}", alert.pid), alert.cpu, alert.memory);
        info!(
            "Watching pid {}: cpu > {}%, memory > {}%",
            alert.pid, alert.cpu, alert.memory
        );
    }

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting sampling loop");

    let mut poll_count: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let ran = sampler.poll(Instant::now());
        if !ran.is_empty() {
            poll_count += 1;
            let labels: Vec<&str> = ran.iter().map(|d| d.label()).collect();
            debug!(poll = poll_count, domains = ?labels, "refreshed");

            if ran.contains(&Domain::Processes) {
                log_summary(&sampler);
            }
            for event in &sampler.report().alert_events {
                warn!(
                    "Alert: {} ({}) {:?} at {:.1}% over {:.1}%",
                    event.name, event.pid, event.kind, event.value, event.threshold
                );
            }
        }

        if let Some(max) = args.iterations
            && poll_count >= max
        {
            info!("Reached {} polls", max);
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = sampler.scheduler().time_until_due(Instant::now());
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutting down after {} polls", poll_count);
}
