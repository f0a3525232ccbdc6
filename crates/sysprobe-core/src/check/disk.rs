//! Disk usage parser for `df -k` / `df -i` output.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SkipReason;
use super::tabular::{TabularRecord, parse_table};
use crate::platform::Platform;

/// Usage figures for one volume.
///
/// Kilobytes in space mode, inode counts in inode mode. The source tool
/// rounds the columns independently, so `total == used + available` is not
/// guaranteed and is never asserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeUsage {
    /// Device path, or mount point when the check was built with
    /// `use_mount`.
    pub name: String,
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// Space and inode usage for every real volume seen in one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskUsage {
    pub volumes: Vec<VolumeUsage>,
    pub inodes: Vec<VolumeUsage>,
}

/// Parses the space-mode and inode-mode `df` reports.
#[derive(Debug, Clone, Copy)]
pub struct DiskCheck {
    platform: Platform,
    use_mount: bool,
}

impl DiskCheck {
    pub fn new(platform: Platform, use_mount: bool) -> Self {
        Self {
            platform,
            use_mount,
        }
    }

    /// Turns one `df -k` text and one `df -i` text into usage records.
    ///
    /// Rows that fail integer conversion are dropped with a logged
    /// diagnostic; the call itself only fails when the inputs could not be
    /// captured at all, which the collector reports before reaching here.
    pub fn collect(&self, space_text: &str, inode_text: &str) -> DiskUsage {
        DiskUsage {
            volumes: self.extract(space_text, false),
            inodes: self.extract(inode_text, true),
        }
    }

    fn extract(&self, text: &str, inodes: bool) -> Vec<VolumeUsage> {
        let scan = parse_table(text, self.use_mount);
        let mut out = Vec::with_capacity(scan.records.len());

        for record in &scan.records {
            match self.convert_row(record, inodes) {
                Ok(volume) => out.push(volume),
                Err(skip) => {
                    debug!(
                        volume = record.first().map(String::as_str).unwrap_or(""),
                        reason = %skip,
                        "dropping df row"
                    );
                }
            }
        }

        out
    }

    fn convert_row(&self, record: &TabularRecord, inodes: bool) -> Result<VolumeUsage, SkipReason> {
        let column = |idx: usize| -> Result<u64, SkipReason> {
            let field = record.get(idx).ok_or(SkipReason::MissingColumns {
                expected: idx + 1,
                found: record.len(),
            })?;
            field
                .parse()
                .map_err(|_| SkipReason::NonNumericField { column: idx })
        };

        let (total, used, available) = if inodes && self.platform == Platform::Darwin {
            // darwin df -i: Filesystem 512-blocks Used Available Capacity
            // iused ifree %iused Mounted — raw counts sit in columns 5/6
            // and the total has to be computed.
            let used = column(5)?;
            let free = column(6)?;
            (used + free, used, free)
        } else {
            (column(1)?, column(2)?, column(3)?)
        };

        Ok(VolumeUsage {
            name: record[0].clone(),
            total,
            used,
            available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DF_K_LINUX: &str = "\
Filesystem           1K-blocks      Used Available Use% Mounted on
/dev/sda1             61875072  23741436  34990596  41% /
tmpfs                  1896428         0   1896428   0% /lib/init/rw
/dev/sdb               9983232    171968   9294848   2% /mnt
";

    const DF_I_LINUX: &str = "\
Filesystem            Inodes   IUsed   IFree IUse% Mounted on
/dev/sda1            3932160  439704 3492456   12% /
tmpfs                 474107     487  473620    1% /lib/init/rw
";

    const DF_I_DARWIN: &str = "\
Filesystem    512-blocks      Used Available Capacity  iused    ifree %iused  Mounted on
/dev/disk0s2   488555536 313696448 174347088    65% 39276054 21793386   64%   /
";

    #[test]
    fn space_mode_reads_fixed_columns() {
        let check = DiskCheck::new(Platform::Linux, false);
        let usage = check.collect(DF_K_LINUX, DF_I_LINUX);

        assert_eq!(usage.volumes.len(), 3);
        assert_eq!(
            usage.volumes[0],
            VolumeUsage {
                name: "/dev/sda1".into(),
                total: 61875072,
                used: 23741436,
                available: 34990596,
            }
        );
    }

    #[test]
    fn inode_mode_linux_reads_fixed_columns() {
        let check = DiskCheck::new(Platform::Linux, false);
        let usage = check.collect(DF_K_LINUX, DF_I_LINUX);

        assert_eq!(usage.inodes.len(), 2);
        assert_eq!(
            usage.inodes[0],
            VolumeUsage {
                name: "/dev/sda1".into(),
                total: 3932160,
                used: 439704,
                available: 3492456,
            }
        );
    }

    #[test]
    fn inode_mode_darwin_computes_total() {
        let check = DiskCheck::new(Platform::Darwin, false);
        let usage = check.collect("", DF_I_DARWIN);

        assert_eq!(usage.inodes.len(), 1);
        assert_eq!(
            usage.inodes[0],
            VolumeUsage {
                name: "/dev/disk0s2".into(),
                total: 39276054 + 21793386,
                used: 39276054,
                available: 21793386,
            }
        );
    }

    #[test]
    fn mount_point_anchors_records_when_requested() {
        let check = DiskCheck::new(Platform::Linux, true);
        let usage = check.collect(DF_K_LINUX, "");
        assert_eq!(usage.volumes[0].name, "/");
        assert_eq!(usage.volumes[2].name, "/mnt");
    }

    #[test]
    fn short_row_is_dropped_not_fatal() {
        let text = "\
Filesystem           1K-blocks      Used Available Use% Mounted on
/dev/sda1             61875072  23741436  34990596  41% /
/dev/sdc              12345
";
        let check = DiskCheck::new(Platform::Linux, false);
        let usage = check.collect(text, "");
        assert_eq!(usage.volumes.len(), 1);
        assert_eq!(usage.volumes[0].name, "/dev/sda1");
    }

    #[test]
    fn empty_report_yields_empty_records() {
        let check = DiskCheck::new(Platform::Linux, false);
        let usage = check.collect("Filesystem 1K-blocks Used Available\n", "");
        assert!(usage.volumes.is_empty());
        assert!(usage.inodes.is_empty());
    }
}
