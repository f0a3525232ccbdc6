//! Aggregate CPU utilization parser for `mpstat` / `iostat` output.
//!
//! Column sets differ between kernel and tool versions (Debian says
//! `%user` where others say `%usr`, `%steal` may be missing entirely), so
//! values are aligned to the header by name and absent columns contribute
//! zero instead of failing the record.

use serde::{Deserialize, Serialize};

use super::CheckError;
use crate::platform::Platform;

/// Aggregate CPU time breakdown in percent.
///
/// The source tools round each column independently; the fields sum to
/// roughly, not exactly, 100.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuUtilization {
    pub user: f64,
    pub system: f64,
    pub io_wait: f64,
    pub idle: f64,
    pub stolen: f64,
}

/// Parses one multi-sample CPU report into an aggregate breakdown.
#[derive(Debug, Clone, Copy)]
pub struct CpuCheck {
    platform: Platform,
}

impl CpuCheck {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Collects the aggregate breakdown from `mpstat 1 3` output on Linux
    /// or `iostat -C -w 3 -c 2` output on Darwin.
    pub fn collect(&self, text: &str) -> Result<CpuUtilization, CheckError> {
        match self.platform {
            Platform::Linux => parse_mpstat(text),
            Platform::Darwin => parse_iostat(text),
            other => Err(CheckError::UnsupportedPlatform(other)),
        }
    }
}

/// Value of the named column in the summary row, zero when the column is
/// not present in this tool version.
fn column_value(headers: &[&str], data: &[&str], name: &str) -> f64 {
    headers
        .iter()
        .position(|h| *h == name)
        .and_then(|idx| data.get(idx))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.0)
}

fn parse_mpstat(text: &str) -> Result<CpuUtilization, CheckError> {
    // Usually the line carrying %usr or %user; any %-column header will
    // do, since every named lookup below defaults to zero when absent.
    let legend = text
        .lines()
        .find(|l| l.split_whitespace().any(|tok| tok.starts_with('%')))
        .ok_or(CheckError::MissingHeader("mpstat legend"))?;
    let summary = text
        .lines()
        .find(|l| l.contains("Average"))
        .ok_or(CheckError::MissingHeader("mpstat Average"))?;

    // The legend carries an AM/PM token the Average row does not; drop it
    // so the columns line up by index.
    let headers: Vec<&str> = legend
        .split_whitespace()
        .filter(|h| *h != "AM" && *h != "PM")
        .collect();
    let data: Vec<&str> = summary.split_whitespace().collect();

    // Debian lenny says %user, everyone else %usr; one of the two is 0.
    let user = column_value(&headers, &data, "%usr")
        + column_value(&headers, &data, "%user")
        + column_value(&headers, &data, "%nice");
    let system = column_value(&headers, &data, "%sys")
        + column_value(&headers, &data, "%irq")
        + column_value(&headers, &data, "%soft");

    Ok(CpuUtilization {
        user,
        system,
        io_wait: column_value(&headers, &data, "%iowait"),
        idle: column_value(&headers, &data, "%idle"),
        stolen: column_value(&headers, &data, "%steal"),
    })
}

fn parse_iostat(text: &str) -> Result<CpuUtilization, CheckError> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    let legend = lines
        .iter()
        .find(|l| l.split_whitespace().any(|tok| tok == "us"))
        .ok_or(CheckError::MissingHeader("iostat legend"))?;
    // iostat keeps printing samples; the last line is the freshest.
    let summary = lines.last().ok_or(CheckError::MissingHeader("iostat sample"))?;

    let headers: Vec<&str> = legend.split_whitespace().collect();
    let data: Vec<&str> = summary.split_whitespace().collect();

    Ok(CpuUtilization {
        user: column_value(&headers, &data, "us"),
        system: column_value(&headers, &data, "sy"),
        io_wait: 0.0,
        idle: column_value(&headers, &data, "id"),
        stolen: 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MPSTAT_USR: &str = "\
Linux 2.6.32-341-ec2 (ip) \t01/19/2012 \t_x86_64_\t(2 CPU)

04:22:41 PM  CPU    %usr   %nice    %sys %iowait    %irq   %soft  %steal  %guest   %idle
04:22:42 PM  all    0.00    0.00    0.00    0.00    0.00    0.00    0.00    0.00  100.00
04:22:43 PM  all    1.00    0.00    0.00    0.00    0.00    0.00    0.00    0.00   99.00
Average:     all    5.50    2.00    1.00    0.50    0.25    0.25    0.75    0.00   90.00
";

    const MPSTAT_USER: &str = "\
Linux 2.6.26-2-xen-amd64 (atira)  02/17/2012  _x86_64_

05:27:03 PM  CPU    %user   %nice   %sys %iowait    %irq   %soft  %steal  %idle   intr/s
05:27:03 PM  all    3.59    0.00    0.68    0.69    0.00   0.00    0.01   95.03    43.65
Average:     all    3.59    0.00    0.68    0.69    0.00   0.00    0.01   95.03    43.65
";

    const IOSTAT_DARWIN: &str = "\
          disk0           disk1       cpu     load average
    KB/t tps  MB/s     KB/t tps  MB/s  us sy id   1m   5m   15m
   21.23  13  0.27    17.85   7  0.13  14  7 79  1.04 1.27 1.31
    4.00   3  0.01     5.00   8  0.04  12 10 78  1.04 1.27 1.31
";

    #[test]
    fn mpstat_usr_variant() {
        let cpu = CpuCheck::new(Platform::Linux).collect(MPSTAT_USR).unwrap();
        assert!((cpu.user - 7.50).abs() < 1e-9); // %usr + %nice
        assert!((cpu.system - 1.50).abs() < 1e-9); // %sys + %irq + %soft
        assert!((cpu.io_wait - 0.50).abs() < 1e-9);
        assert!((cpu.idle - 90.00).abs() < 1e-9);
        assert!((cpu.stolen - 0.75).abs() < 1e-9);
    }

    #[test]
    fn mpstat_user_variant_folds_into_same_schema() {
        let cpu = CpuCheck::new(Platform::Linux).collect(MPSTAT_USER).unwrap();
        assert!((cpu.user - 3.59).abs() < 1e-9);
        assert!((cpu.system - 0.68).abs() < 1e-9);
        assert!((cpu.idle - 95.03).abs() < 1e-9);
        assert!((cpu.stolen - 0.01).abs() < 1e-9);
    }

    #[test]
    fn missing_columns_default_to_zero() {
        // No %steal, no %irq, no %soft in this header.
        let text = "\
03:00:00 PM  CPU    %usr   %nice    %sys %iowait   %idle
Average:     all    2.00    1.00    0.50    0.25   96.25
";
        let cpu = CpuCheck::new(Platform::Linux).collect(text).unwrap();
        assert!((cpu.user - 3.00).abs() < 1e-9);
        assert!((cpu.system - 0.50).abs() < 1e-9);
        assert!((cpu.stolen - 0.0).abs() < 1e-9);
    }

    #[test]
    fn absent_usr_and_user_columns_contribute_zero() {
        let text = "\
03:00:00 PM  CPU   %nice    %sys %iowait   %idle
Average:     all    1.00    0.50    0.25   98.25
";
        let cpu = CpuCheck::new(Platform::Linux).collect(text).unwrap();
        assert!((cpu.user - 1.00).abs() < 1e-9); // %nice only
        assert!((cpu.system - 0.50).abs() < 1e-9);
        assert!((cpu.idle - 98.25).abs() < 1e-9);
    }

    #[test]
    fn iostat_darwin_uses_last_sample() {
        let cpu = CpuCheck::new(Platform::Darwin).collect(IOSTAT_DARWIN).unwrap();
        assert!((cpu.user - 12.0).abs() < 1e-9);
        assert!((cpu.system - 10.0).abs() < 1e-9);
        assert!((cpu.idle - 78.0).abs() < 1e-9);
        assert!((cpu.io_wait - 0.0).abs() < 1e-9);
        assert!((cpu.stolen - 0.0).abs() < 1e-9);
    }

    #[test]
    fn missing_legend_is_a_failure() {
        let err = CpuCheck::new(Platform::Linux)
            .collect("no such output\n")
            .unwrap_err();
        assert!(matches!(err, CheckError::MissingHeader(_)));
    }

    #[test]
    fn freebsd_is_unsupported() {
        let err = CpuCheck::new(Platform::FreeBsd).collect("").unwrap_err();
        assert!(matches!(
            err,
            CheckError::UnsupportedPlatform(Platform::FreeBsd)
        ));
    }
}
