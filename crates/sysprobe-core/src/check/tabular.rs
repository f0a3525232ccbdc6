//! Generic tokenizer for whitespace-delimited tabular tool output.
//!
//! `df`-style reports share a shape: one header line, then one row per
//! volume, except that a volume name too long for its column is emitted on
//! a line of its own and the measurements follow on the next line. This
//! module turns that shape into clean per-row field vectors and leaves the
//! mode-specific numeric extraction to the callers.

use tracing::debug;

use super::{RowSkip, SkipReason};

/// One logical row: ordered fields, possibly collated from two physical
/// lines.
pub type TabularRecord = Vec<String>;

/// Result of scanning one table: surviving rows plus per-row skip
/// diagnostics for everything that was dropped.
#[derive(Debug, Default)]
pub struct TableScan {
    pub records: Vec<TabularRecord>,
    pub skipped: Vec<RowSkip>,
}

/// True if the token starts with an ASCII digit, the same test the
/// source tools' own consumers use to tell a measurement from a name.
pub(crate) fn looks_numeric(token: &str) -> bool {
    token.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

/// Scans `df`-style output into records.
///
/// - line 0 (the header) and blank lines are discarded;
/// - a single-field line is held back as an overflow volume name and
///   collated onto the next data-bearing line;
/// - rows whose first field is `none` or whose second field is not numeric
///   are synthetic filesystems and are skipped;
/// - with `use_mount`, field 0 is replaced by the last field (the mount
///   point) instead of the device identifier.
///
/// A fully empty input (header only) yields an empty scan, not an error.
/// Row order is input order.
pub fn parse_table(text: &str, use_mount: bool) -> TableScan {
    let mut scan = TableScan::default();
    let mut pending: Option<String> = None;

    for (line_no, line) in text.lines().enumerate().skip(1) {
        let mut parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if parts.is_empty() {
            continue;
        }

        if parts.len() == 1 {
            // Volume name on a line by itself; data follows on the next line.
            pending = Some(parts.remove(0));
            continue;
        }

        if parts[0] == "none" || !looks_numeric(&parts[1]) {
            debug!(line = line_no, "skipping synthetic filesystem row");
            scan.skipped.push(RowSkip {
                line: line_no,
                reason: SkipReason::SyntheticVolume,
            });
            continue;
        }

        // The remembered name survives intervening skipped rows; only a
        // numeric-leading data row consumes it.
        if looks_numeric(&parts[0])
            && let Some(name) = pending.take()
        {
            parts.insert(0, name);
        }

        if use_mount
            && let Some(mount) = parts.last().cloned()
        {
            parts[0] = mount;
        }

        scan.records.push(parts);
    }

    scan
}
