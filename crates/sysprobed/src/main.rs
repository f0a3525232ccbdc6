//! sysprobed - Host metrics collection daemon.
//!
//! Collects disk, CPU, memory, load, network and process metrics from
//! platform-native tools and prints one JSON snapshot per cycle to
//! stdout.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use sysprobe_core::collector::{Collector, Snapshot};
use sysprobe_core::fsread::RealProcFs;
use sysprobe_core::platform::Platform;
use sysprobe_core::runner::ShellRunner;

/// Host metrics collection daemon.
#[derive(Parser)]
#[command(name = "sysprobed", about = "Host metrics collection daemon", version)]
struct Args {
    /// Collection interval in seconds.
    #[arg(short, long, default_value = "10")]
    interval: u64,

    /// Number of snapshots to take before exiting. 0 means run forever.
    #[arg(short, long, default_value = "0")]
    count: u64,

    /// Platform whose tool output formats to expect (linux, freebsd,
    /// darwin). Defaults to the platform this process runs on.
    #[arg(long)]
    platform: Option<Platform>,

    /// Path to the proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Report disk volumes by mount point instead of device name.
    #[arg(long)]
    use_mount: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
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

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("sysprobed={}", level).parse().unwrap())
        .add_directive(format!("sysprobe_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Describes the contents of a snapshot for logging.
fn describe_snapshot(snapshot: &Snapshot) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(ref disk) = snapshot.disk {
        parts.push(format!("{} volumes", disk.volumes.len()));
    }
    if let Some(ref io) = snapshot.io {
        parts.push(format!("{} devices", io.len()));
    }
    if snapshot.cpu.is_some() {
        parts.push("cpu".to_string());
    }
    if snapshot.memory.is_some() {
        parts.push("memory".to_string());
    }
    if snapshot.load.is_some() {
        parts.push("load".to_string());
    }
    if let Some(ref network) = snapshot.network {
        parts.push(format!("{} interfaces", network.counters.len()));
    }
    if let Some(ref processes) = snapshot.processes {
        parts.push(format!("{} processes", processes.len()));
    }

    if parts.is_empty() {
        "nothing collected".to_string()
    } else {
        parts.join(", ")
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let platform = match args.platform.or_else(Platform::current) {
        Some(p) => p,
        None => {
            error!("this platform is not supported; pass --platform explicitly");
            return ExitCode::FAILURE;
        }
    };

    info!("sysprobed {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: platform={}, interval={}s, proc={}, use_mount={}",
        platform, args.interval, args.proc_path, args.use_mount
    );

    let mut collector = Collector::new(
        platform,
        ShellRunner::new(),
        RealProcFs::new(),
        &args.proc_path,
        args.use_mount,
    );

    let interval = Duration::from_secs(args.interval);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting collection loop");
    let mut snapshot_count: u64 = 0;

    while running.load(Ordering::SeqCst) {
        let snapshot = collector.collect_snapshot(Utc::now());
        snapshot_count += 1;
        info!("Snapshot #{}: {}", snapshot_count, describe_snapshot(&snapshot));

        match serde_json::to_string(&snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }

        if args.count > 0 && snapshot_count >= args.count {
            break;
        }

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::describe_snapshot;
    use chrono::Utc;
    use sysprobe_core::collector::Snapshot;

    #[test]
    fn describe_snapshot_lists_present_families() {
        let snapshot = Snapshot {
            taken_at: Utc::now(),
            disk: None,
            io: None,
            cpu: Some(Default::default()),
            memory: None,
            load: Some(Default::default()),
            network: Some(Default::default()),
            processes: None,
        };

        let desc = describe_snapshot(&snapshot);
        assert!(desc.contains("cpu"));
        assert!(desc.contains("load"));
        assert!(desc.contains("0 interfaces"));
        assert!(!desc.contains("volumes"));
    }

    #[test]
    fn empty_snapshot_is_described_as_such() {
        let snapshot = Snapshot {
            taken_at: Utc::now(),
            disk: None,
            io: None,
            cpu: None,
            memory: None,
            load: None,
            network: None,
            processes: None,
        };
        assert_eq!(describe_snapshot(&snapshot), "nothing collected");
    }
}
