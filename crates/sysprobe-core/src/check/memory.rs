//! Memory snapshot parser.
//!
//! Linux and procfs-mounted FreeBSD report through `/proc/meminfo`
//! key:value text; FreeBSD without procfs reports through
//! `sysctl`/`vmstat`/`swapinfo`; Darwin through `top`/`sysctl`. Each shape
//! is one [`MemorySample`] variant, so the platform branch is picked once
//! by whoever captured the text.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CheckError;

/// Physical and swap usage in megabytes.
///
/// `cached` is `None` on platforms that do not report a page-cache figure;
/// zero would claim a measurement that was never made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub phys_used: u64,
    pub phys_free: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    pub cached: Option<u64>,
}

/// Captured memory-tool output, tagged by shape.
#[derive(Debug, Clone, Copy)]
pub enum MemorySample<'a> {
    /// `/proc/meminfo` key:value text (Linux, or FreeBSD with procfs).
    Meminfo(&'a str),
    /// FreeBSD native tools: `sysctl -n hw.physmem`, `vmstat -H`,
    /// `swapinfo -k`.
    FreeBsdNative {
        physmem: &'a str,
        vmstat: &'a str,
        swapinfo: &'a str,
    },
    /// Darwin native tools: `top -l 1` and `sysctl vm.swapusage`.
    DarwinNative { top: &'a str, swapusage: &'a str },
}

/// Normalizes one memory sample to megabytes.
pub fn collect_memory(sample: &MemorySample<'_>) -> Result<MemoryUsage, CheckError> {
    match sample {
        MemorySample::Meminfo(text) => Ok(parse_meminfo(text)),
        MemorySample::FreeBsdNative {
            physmem,
            vmstat,
            swapinfo,
        } => parse_freebsd_native(physmem, vmstat, swapinfo),
        MemorySample::DarwinNative { top, swapusage } => parse_darwin_native(top, swapusage),
    }
}

/// Runs of consecutive ASCII digits in a line, at least `min_len` long.
///
/// The length floor matters on report lines where single digits are noise
/// (vmstat's procs columns, device names like `ad0s1b`).
fn digit_runs(line: &str, min_len: usize) -> Vec<u64> {
    let mut out = Vec::new();
    let mut run = String::new();
    for ch in line.chars().chain(std::iter::once(' ')) {
        if ch.is_ascii_digit() {
            run.push(ch);
        } else if !run.is_empty() {
            if run.len() >= min_len
                && let Ok(v) = run.parse()
            {
                out.push(v);
            }
            run.clear();
        }
    }
    out
}

/// Decimal tokens of the form `digits.digits` in a line.
pub(crate) fn float_runs(line: &str) -> Vec<f64> {
    let mut out = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                if let Ok(v) = line[start..i].parse() {
                    out.push(v);
                }
            }
        } else {
            i += 1;
        }
    }
    out
}

fn parse_meminfo(text: &str) -> MemoryUsage {
    // Leading integer of each `Key: value kB` line, keyed by name.
    let lookup = |wanted: &str| -> Option<u64> {
        text.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim() != wanted {
                return None;
            }
            value.split_whitespace().next()?.parse().ok()
        })
    };

    let mut usage = MemoryUsage::default();

    // Phys and swap groups are independent: a missing key in one must not
    // blank the other. Subtraction happens in kB, division to MB after.
    match (lookup("MemTotal"), lookup("MemFree")) {
        (Some(total), Some(free)) => {
            usage.phys_used = total.saturating_sub(free) / 1024;
            usage.phys_free = free / 1024;
        }
        _ => debug!("meminfo: MemTotal or MemFree not present"),
    }
    usage.cached = lookup("Cached").map(|kb| kb / 1024);

    match (lookup("SwapTotal"), lookup("SwapFree")) {
        (Some(total), Some(free)) => {
            usage.swap_used = total.saturating_sub(free) / 1024;
            usage.swap_free = free / 1024;
        }
        _ => debug!("meminfo: SwapTotal or SwapFree not present"),
    }

    usage
}

fn parse_freebsd_native(
    physmem: &str,
    vmstat: &str,
    swapinfo: &str,
) -> Result<MemoryUsage, CheckError> {
    let phys_total_kb = physmem
        .trim()
        .parse::<u64>()
        .map_err(|_| CheckError::Malformed("hw.physmem is not an integer".into()))?
        / 1024;

    // vmstat -H: two header lines, then the sample row; `fre` is the
    // second multi-digit figure.
    let sample = vmstat
        .lines()
        .nth(2)
        .ok_or(CheckError::MissingHeader("vmstat sample"))?;
    let phys_parts = digit_runs(sample, 2);
    let phys_free_kb = *phys_parts
        .get(1)
        .ok_or_else(|| CheckError::Malformed("vmstat row too short".into()))?;
    let phys_used_kb = phys_total_kb.saturating_sub(phys_free_kb);

    // swapinfo -k: header, then one row per swap device; the device name
    // itself contains digits, hence the fixed positions 3 and 4.
    let swap_row = swapinfo
        .lines()
        .nth(1)
        .ok_or(CheckError::MissingHeader("swapinfo row"))?;
    let swap_parts = digit_runs(swap_row, 1);
    let swap_used_kb = *swap_parts
        .get(3)
        .ok_or_else(|| CheckError::Malformed("swapinfo row too short".into()))?;
    let swap_free_kb = *swap_parts
        .get(4)
        .ok_or_else(|| CheckError::Malformed("swapinfo row too short".into()))?;

    Ok(MemoryUsage {
        phys_used: phys_used_kb / 1024,
        phys_free: phys_free_kb / 1024,
        swap_used: swap_used_kb / 1024,
        swap_free: swap_free_kb / 1024,
        cached: None,
    })
}

fn parse_darwin_native(top: &str, swapusage: &str) -> Result<MemoryUsage, CheckError> {
    // top -l 1 PhysMem report, figures already in megabytes:
    // PhysMem: 330M wired, 1016M active, 179M inactive, 1525M used, 522M free.
    let phys_line = top
        .lines()
        .find(|l| l.contains("PhysMem"))
        .ok_or(CheckError::MissingHeader("top PhysMem"))?;
    let phys_parts = digit_runs(phys_line, 2);
    let phys_used = *phys_parts
        .get(3)
        .ok_or_else(|| CheckError::Malformed("PhysMem line too short".into()))?;
    let phys_free = *phys_parts
        .get(4)
        .ok_or_else(|| CheckError::Malformed("PhysMem line too short".into()))?;

    // vm.swapusage: total = 2048.00M  used = 1017.75M  free = 1030.25M
    let swap_parts = float_runs(swapusage);
    let swap_used = *swap_parts
        .get(1)
        .ok_or_else(|| CheckError::Malformed("vm.swapusage too short".into()))?;
    let swap_free = *swap_parts
        .get(2)
        .ok_or_else(|| CheckError::Malformed("vm.swapusage too short".into()))?;

    Ok(MemoryUsage {
        phys_used,
        phys_free,
        swap_used: swap_used as u64,
        swap_free: swap_free as u64,
        cached: None,
    })
}
