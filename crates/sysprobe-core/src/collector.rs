//! Snapshot collector tying checks to their input sources.
//!
//! The collector knows which tool or pseudo file feeds each check on
//! each platform, captures the text through the [`CommandRunner`] and
//! [`ProcFs`] seams and hands it to the parsers. Metric families fail
//! independently: a broken `mpstat` costs the CPU figures of one cycle,
//! nothing else.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::check::process::ProcessRow;
use crate::check::{
    CheckError, CpuCheck, CpuUtilization, DeviceIoStats, DiskCheck, DiskUsage, IoCheck,
    LoadAverage, MemorySample, MemoryUsage, NetworkTracker, NetworkUsage, collect_load_average,
    collect_memory, parse_process_list,
};
use crate::fsread::ProcFs;
use crate::platform::Platform;
use crate::runner::CommandRunner;

/// One collection cycle. A `None` family failed this cycle; the cause
/// was logged when it happened.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub disk: Option<DiskUsage>,
    pub io: Option<HashMap<String, DeviceIoStats>>,
    pub cpu: Option<CpuUtilization>,
    pub memory: Option<MemoryUsage>,
    pub load: Option<LoadAverage>,
    pub network: Option<NetworkUsage>,
    pub processes: Option<Vec<ProcessRow>>,
}

/// Gathers all metric families into snapshots.
///
/// Owns the network tracker, so one collector instance corresponds to
/// one stream of rate baselines.
pub struct Collector<R: CommandRunner, F: ProcFs> {
    platform: Platform,
    runner: R,
    fs: F,
    proc_root: PathBuf,
    disk: DiskCheck,
    io: IoCheck,
    cpu: CpuCheck,
    network: NetworkTracker,
}

impl<R: CommandRunner, F: ProcFs> Collector<R, F> {
    /// Creates a collector for one platform.
    ///
    /// `proc_root` is usually `/proc`; tests point it at a fixture tree.
    /// `use_mount` reports disk volumes by mount point instead of device
    /// name.
    pub fn new(
        platform: Platform,
        runner: R,
        fs: F,
        proc_root: impl Into<PathBuf>,
        use_mount: bool,
    ) -> Self {
        Self {
            platform,
            runner,
            fs,
            proc_root: proc_root.into(),
            disk: DiskCheck::new(platform, use_mount),
            io: IoCheck::new(platform),
            cpu: CpuCheck::new(platform),
            network: NetworkTracker::new(platform),
        }
    }

    /// Runs every check once and assembles the results.
    ///
    /// Never fails as a whole: each family's error is logged and its
    /// slot left empty.
    pub fn collect_snapshot(&mut self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            taken_at: now,
            disk: log_failure("disk", self.collect_disk()),
            io: log_failure("io", self.collect_io()),
            cpu: log_failure("cpu", self.collect_cpu()),
            memory: log_failure("memory", self.collect_memory()),
            load: log_failure("load", self.collect_load()),
            network: log_failure("network", self.collect_network(now)),
            processes: log_failure("processes", self.collect_processes()),
        }
    }

    fn collect_disk(&self) -> Result<DiskUsage, CheckError> {
        let space = self.runner.run("df", &["-k"])?;
        let inodes = self.runner.run("df", &["-i"])?;
        Ok(self.disk.collect(&space, &inodes))
    }

    fn collect_io(&self) -> Result<HashMap<String, DeviceIoStats>, CheckError> {
        // Two reports one second apart; the parser reads the second.
        let text = self.runner.run("iostat", &["-d", "1", "2", "-x", "-k"])?;
        self.io.collect(&text)
    }

    fn collect_cpu(&self) -> Result<CpuUtilization, CheckError> {
        let text = match self.platform {
            // Two one-second samples; the summary row is what we parse.
            Platform::Linux => self.runner.run("mpstat", &["1", "3"])?,
            Platform::Darwin => self.runner.run("iostat", &["-C", "-w", "3", "-c", "2"])?,
            other => return Err(CheckError::UnsupportedPlatform(other)),
        };
        self.cpu.collect(&text)
    }

    fn collect_memory(&self) -> Result<MemoryUsage, CheckError> {
        match self.platform {
            Platform::Linux => {
                let meminfo = self.fs.read_to_string(&self.proc_root.join("meminfo"))?;
                collect_memory(&MemorySample::Meminfo(&meminfo))
            }
            Platform::FreeBsd => {
                // linprocfs, when mounted, serves a Linux-shaped meminfo.
                let meminfo_path = self.proc_root.join("meminfo");
                if self.fs.exists(&meminfo_path) {
                    let meminfo = self.fs.read_to_string(&meminfo_path)?;
                    return collect_memory(&MemorySample::Meminfo(&meminfo));
                }
                let physmem = self.runner.run("sysctl", &["-n", "hw.physmem"])?;
                let vmstat = self.runner.run("vmstat", &["-H"])?;
                let swapinfo = self.runner.run("swapinfo", &["-k"])?;
                collect_memory(&MemorySample::FreeBsdNative {
                    physmem: &physmem,
                    vmstat: &vmstat,
                    swapinfo: &swapinfo,
                })
            }
            Platform::Darwin => {
                let top = self.runner.run("top", &["-l", "1"])?;
                let swapusage = self.runner.run("sysctl", &["vm.swapusage"])?;
                collect_memory(&MemorySample::DarwinNative {
                    top: &top,
                    swapusage: &swapusage,
                })
            }
        }
    }

    fn collect_load(&self) -> Result<LoadAverage, CheckError> {
        // Linux always has loadavg; FreeBSD only when linprocfs is
        // mounted, and Darwin never does.
        let loadavg_path = self.proc_root.join("loadavg");
        let text = match self.platform {
            Platform::Linux => self.fs.read_to_string(&loadavg_path)?,
            Platform::FreeBsd if self.fs.exists(&loadavg_path) => {
                self.fs.read_to_string(&loadavg_path)?
            }
            _ => self.runner.run("uptime", &[])?,
        };
        collect_load_average(&text)
    }

    fn collect_network(&mut self, now: DateTime<Utc>) -> Result<NetworkUsage, CheckError> {
        let text = match self.platform {
            Platform::Linux => self.fs.read_to_string(&self.proc_root.join("net/dev"))?,
            Platform::FreeBsd => self.runner.run("netstat", &["-nbid"])?,
            other => return Err(CheckError::UnsupportedPlatform(other)),
        };
        self.network.collect(&text, now)
    }

    fn collect_processes(&self) -> Result<Vec<ProcessRow>, CheckError> {
        let text = self.runner.run("ps", &["auxww"])?;
        Ok(parse_process_list(&text))
    }
}

fn log_failure<T>(family: &'static str, result: Result<T, CheckError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(family, error = %e, "check failed, skipping this cycle");
            None
        }
    }
}
