//! Per-device I/O statistics parser for extended `iostat` output.
//!
//! `iostat -d 1 2 -x -k` prints two reports; the first covers the time
//! since boot and only the second reflects the sampling interval, so
//! parsing starts at the second `Device:` section. The extended column
//! set varies between sysstat versions, so values are keyed by the
//! column names the header actually carries, like the CPU parser does.

use std::collections::HashMap;

use super::CheckError;
use super::memory::float_runs;
use crate::platform::Platform;

/// Column name to value for one device, e.g. `"await" -> 14.18`.
pub type DeviceIoStats = HashMap<String, f64>;

/// Parses one extended `iostat` report into per-device statistics.
#[derive(Debug, Clone, Copy)]
pub struct IoCheck {
    platform: Platform,
}

impl IoCheck {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn collect(&self, text: &str) -> Result<HashMap<String, DeviceIoStats>, CheckError> {
        match self.platform {
            Platform::Linux => parse_iostat_extended(text),
            other => Err(CheckError::UnsupportedPlatform(other)),
        }
    }
}

fn parse_iostat_extended(text: &str) -> Result<HashMap<String, DeviceIoStats>, CheckError> {
    // Skip the preamble and the since-boot report.
    let recent = text
        .split("Device:")
        .nth(2)
        .ok_or(CheckError::MissingHeader("second iostat Device section"))?;
    let mut lines = recent.lines();
    let headers: Vec<&str> = lines
        .next()
        .ok_or(CheckError::MissingHeader("iostat column header"))?
        .split_whitespace()
        .collect();

    let mut stats = HashMap::new();
    let mut device: Option<&str> = None;

    for row in lines {
        if row.trim().is_empty() {
            continue;
        }
        // A device name too long for its column sits on a line of its
        // own; the values follow on the next, indented line.
        if let Some(name) = leading_device_name(row) {
            device = Some(name);
        }
        let values = float_runs(row);
        if values.is_empty() {
            continue;
        }
        if let Some(name) = device {
            stats.insert(
                name.to_string(),
                headers
                    .iter()
                    .zip(values)
                    .map(|(h, v)| (h.to_string(), v))
                    .collect(),
            );
        }
    }

    Ok(stats)
}

/// Device identifier at the very start of the row, if any.
fn leading_device_name(row: &str) -> Option<&str> {
    let end = row
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '/'))
        .unwrap_or(row.len());
    (end > 0).then(|| &row[..end])
}
