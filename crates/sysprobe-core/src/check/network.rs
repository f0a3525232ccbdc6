//! Network interface counter tracker.
//!
//! The kernel exposes cumulative byte counters; a throughput figure only
//! exists between two samples. The tracker owns the per-interface
//! baselines for the life of the process: the first observation of an
//! interface stores its counters and emits nothing, every later
//! observation emits `(current - baseline) / elapsed` and overwrites the
//! baseline. Interfaces that disappear simply stop being updated.
//!
//! One tracker instance must see at most one collection cycle at a time;
//! interleaved calls would corrupt the baselines.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CheckError, RowSkip, SkipReason};
use crate::platform::Platform;

/// Cumulative counters parsed for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Receive + transmit errors.
    pub errors: u64,
    pub drops: u64,
}

/// Derived per-second throughput for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRate {
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

/// Network family result for one cycle.
///
/// `counters` carries every interface parsed this cycle, cumulative as
/// reported. `rates` only carries interfaces that had a baseline and a
/// non-decreasing counter, so it is empty on the first cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkUsage {
    pub counters: HashMap<String, InterfaceCounters>,
    pub rates: HashMap<String, InterfaceRate>,
}

#[derive(Debug, Clone, Copy)]
struct InterfaceBaseline {
    rx_bytes: u64,
    tx_bytes: u64,
}

/// Converts cumulative interface counters into per-second rates across
/// successive collection cycles.
#[derive(Debug)]
pub struct NetworkTracker {
    platform: Platform,
    baseline: HashMap<String, InterfaceBaseline>,
    last_sample: Option<DateTime<Utc>>,
}

impl NetworkTracker {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            baseline: HashMap::new(),
            last_sample: None,
        }
    }

    /// Parses one counter report and returns the counters plus the rates
    /// since the previous call.
    ///
    /// The first call of the process stores baselines and returns no
    /// rates. A later call sharing a timestamp with the previous one
    /// fails with [`CheckError::ZeroInterval`]; rate is undefined over a
    /// zero interval and the cycle is not consumed. Interfaces seen for
    /// the first time, and interfaces whose counters went backwards
    /// (reset), are re-baselined and omitted from the rate map rather
    /// than reported as zero or negative.
    pub fn collect(
        &mut self,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<NetworkUsage, CheckError> {
        let parsed = match self.platform {
            Platform::Linux => parse_proc_net_dev(text)?,
            Platform::FreeBsd => parse_netstat_link(text),
            other => return Err(CheckError::UnsupportedPlatform(other)),
        };
        for skip in &parsed.skipped {
            debug!(line = skip.line, reason = %skip.reason, "dropping interface row");
        }

        let elapsed = match self.last_sample {
            None => None,
            Some(prev) => {
                let secs = (now - prev).num_milliseconds() as f64 / 1000.0;
                if secs <= 0.0 {
                    return Err(CheckError::ZeroInterval);
                }
                Some(secs)
            }
        };
        self.last_sample = Some(now);

        let mut usage = NetworkUsage::default();
        for (name, counters) in parsed.interfaces {
            if let Some(secs) = elapsed
                && let Some(prev) = self.baseline.get(&name)
                && counters.rx_bytes >= prev.rx_bytes
                && counters.tx_bytes >= prev.tx_bytes
            {
                usage.rates.insert(
                    name.clone(),
                    InterfaceRate {
                        rx_bytes_per_sec: (counters.rx_bytes - prev.rx_bytes) as f64 / secs,
                        tx_bytes_per_sec: (counters.tx_bytes - prev.tx_bytes) as f64 / secs,
                    },
                );
            }
            // New interface, counter reset, or first cycle: the stored
            // baseline advances either way.
            self.baseline.insert(
                name.clone(),
                InterfaceBaseline {
                    rx_bytes: counters.rx_bytes,
                    tx_bytes: counters.tx_bytes,
                },
            );
            usage.counters.insert(name, counters);
        }

        Ok(usage)
    }
}

/// One parsed counter report plus the rows it dropped.
#[derive(Debug, Default)]
pub struct InterfaceScan {
    pub interfaces: HashMap<String, InterfaceCounters>,
    pub skipped: Vec<RowSkip>,
}

/// Parses `/proc/net/dev`-shaped text.
///
/// Line 1 names the columns in two `|`-separated groups; the receive
/// group is prefixed `recv_`, the transmit group `trans_`, and values are
/// looked up by those names rather than fixed offsets.
pub fn parse_proc_net_dev(text: &str) -> Result<InterfaceScan, CheckError> {
    let column_line = text
        .lines()
        .nth(1)
        .ok_or(CheckError::MissingHeader("/proc/net/dev column header"))?;
    let mut groups = column_line.split('|');
    let (_, receive, transmit) = match (groups.next(), groups.next(), groups.next()) {
        (Some(face), Some(r), Some(t)) => (face, r, t),
        _ => return Err(CheckError::MissingHeader("/proc/net/dev column header")),
    };

    let columns: Vec<String> = receive
        .split_whitespace()
        .map(|c| format!("recv_{}", c))
        .chain(transmit.split_whitespace().map(|c| format!("trans_{}", c)))
        .collect();
    let index_of = |name: &str| columns.iter().position(|c| c == name);
    let rx_idx = index_of("recv_bytes")
        .ok_or(CheckError::MissingHeader("/proc/net/dev recv bytes column"))?;
    let tx_idx = index_of("trans_bytes")
        .ok_or(CheckError::MissingHeader("/proc/net/dev trans bytes column"))?;

    let mut scan = InterfaceScan::default();
    for (line_no, line) in text.lines().enumerate().skip(2) {
        let Some((face, data)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = data.split_whitespace().collect();

        let counter = |idx: Option<usize>| -> Option<u64> {
            idx.and_then(|i| values.get(i)).and_then(|v| v.parse().ok())
        };
        let (Some(rx_bytes), Some(tx_bytes)) = (counter(Some(rx_idx)), counter(Some(tx_idx)))
        else {
            scan.skipped.push(RowSkip {
                line: line_no,
                reason: SkipReason::MissingColumns {
                    expected: rx_idx.max(tx_idx) + 1,
                    found: values.len(),
                },
            });
            continue;
        };

        // Error and drop counters are optional extras; zero when the
        // kernel omits the columns.
        let errors = counter(index_of("recv_errs")).unwrap_or(0)
            + counter(index_of("trans_errs")).unwrap_or(0);
        let drops = counter(index_of("recv_drop")).unwrap_or(0)
            + counter(index_of("trans_drop")).unwrap_or(0);

        scan.interfaces.insert(
            face.trim().to_string(),
            InterfaceCounters {
                rx_bytes,
                tx_bytes,
                errors,
                drops,
            },
        );
    }

    Ok(scan)
}

/// Parses `netstat -nbid`-shaped text, keeping only link-layer rows.
///
/// The address column is present for some interfaces and absent for
/// others, so a row is 13 or 12 fields wide and the layout is picked by
/// counting fields, never assumed.
pub fn parse_netstat_link(text: &str) -> InterfaceScan {
    let mut scan = InterfaceScan::default();

    for (line_no, line) in text.lines().enumerate() {
        if !line.contains("Link") {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();

        let positions = match fields.len() {
            13 => Some((6, 9, 10, 5, 8)),
            12 => Some((5, 8, 9, 4, 7)),
            _ => None,
        };
        let Some((rx, tx, drop, ierr, oerr)) = positions else {
            scan.skipped.push(RowSkip {
                line: line_no,
                reason: SkipReason::MissingColumns {
                    expected: 12,
                    found: fields.len(),
                },
            });
            continue;
        };

        let counter = |idx: usize| -> Result<u64, SkipReason> {
            fields[idx]
                .parse()
                .map_err(|_| SkipReason::NonNumericField { column: idx })
        };
        let row = counter(rx).and_then(|rx_bytes| {
            Ok(InterfaceCounters {
                rx_bytes,
                tx_bytes: counter(tx)?,
                drops: counter(drop)?,
                errors: counter(ierr)? + counter(oerr)?,
            })
        });

        match row {
            Ok(counters) => {
                scan.interfaces.insert(fields[0].to_string(), counters);
            }
            Err(reason) => scan.skipped.push(RowSkip {
                line: line_no,
                reason,
            }),
        }
    }

    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PROC_NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
  eth0: 9876543     5678    1    2    0     0          0        10 87654321     4321    3    4    0     0       0          0
";

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn net_dev(rx: u64, tx: u64) -> String {
        format!(
            "Inter-|   Receive                             |  Transmit\n \
             face |bytes packets errs drop fifo frame compressed multicast|bytes packets errs drop fifo colls carrier compressed\n \
             eth0: {rx} 10 0 0 0 0 0 0 {tx} 10 0 0 0 0 0 0\n"
        )
    }

    #[test]
    fn proc_net_dev_counters_by_column_name() {
        let scan = parse_proc_net_dev(PROC_NET_DEV).unwrap();
        assert_eq!(scan.interfaces.len(), 2);

        let eth0 = &scan.interfaces["eth0"];
        assert_eq!(eth0.rx_bytes, 9876543);
        assert_eq!(eth0.tx_bytes, 87654321);
        assert_eq!(eth0.errors, 1 + 3);
        assert_eq!(eth0.drops, 2 + 4);
        assert!(scan.skipped.is_empty());
    }

    #[test]
    fn proc_net_dev_short_row_is_skipped() {
        let text = "\
Inter-|   Receive                |  Transmit
 face |bytes packets errs drop|bytes packets errs drop
  eth0: 100 1 0 0 200 1 0 0
  bad0: 100 1
";
        let scan = parse_proc_net_dev(text).unwrap();
        assert_eq!(scan.interfaces.len(), 1);
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].line, 3);
    }

    #[test]
    fn netstat_13_and_12_field_layouts() {
        let text = "\
Name    Mtu Network       Address              Ipkts Ierrs     Ibytes    Opkts Oerrs     Obytes  Coll Drop
em0    1500 <Link#1>      00:1b:21:aa:bb:cc      100     2       1000       90     1       2000     7    0 0
lo0   16384 <Link#2>      500     0       3000      500     0       3000     0    0 0
";
        let scan = parse_netstat_link(text);
        assert_eq!(scan.interfaces.len(), 2);

        let em0 = &scan.interfaces["em0"];
        assert_eq!(em0.rx_bytes, 1000);
        assert_eq!(em0.tx_bytes, 2000);
        assert_eq!(em0.errors, 3);
        assert_eq!(em0.drops, 7);

        let lo0 = &scan.interfaces["lo0"];
        assert_eq!(lo0.rx_bytes, 3000);
        assert_eq!(lo0.tx_bytes, 3000);
        assert_eq!(lo0.errors, 0);
    }

    #[test]
    fn netstat_odd_width_link_row_is_skipped() {
        let text = "em1 1500 <Link#3> 100 200\n";
        let scan = parse_netstat_link(text);
        assert!(scan.interfaces.is_empty());
        assert_eq!(scan.skipped.len(), 1);
    }

    #[test]
    fn first_cycle_stores_baseline_and_emits_no_rate() {
        let mut tracker = NetworkTracker::new(Platform::Linux);
        let usage = tracker.collect(&net_dev(100, 200), at(1000)).unwrap();
        assert!(usage.rates.is_empty());
        // The cumulative counters are still reported.
        assert_eq!(usage.counters["eth0"].rx_bytes, 100);
        assert_eq!(usage.counters["eth0"].tx_bytes, 200);
    }

    #[test]
    fn second_cycle_divides_delta_by_interval() {
        let mut tracker = NetworkTracker::new(Platform::Linux);
        tracker.collect(&net_dev(100, 200), at(1000)).unwrap();

        let usage = tracker.collect(&net_dev(300, 400), at(1002)).unwrap();
        let eth0 = &usage.rates["eth0"];
        assert!((eth0.rx_bytes_per_sec - 100.0).abs() < 1e-9);
        assert!((eth0.tx_bytes_per_sec - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_interval_fails_instead_of_dividing() {
        let mut tracker = NetworkTracker::new(Platform::Linux);
        tracker.collect(&net_dev(100, 200), at(1000)).unwrap();

        let err = tracker.collect(&net_dev(300, 400), at(1000)).unwrap_err();
        assert!(matches!(err, CheckError::ZeroInterval));
    }

    #[test]
    fn counter_reset_rebaselines_without_a_rate() {
        let mut tracker = NetworkTracker::new(Platform::Linux);
        tracker.collect(&net_dev(1000, 1000), at(1000)).unwrap();
        tracker.collect(&net_dev(2000, 2000), at(1010)).unwrap();

        // Interface reset: counters went backwards. No rate this cycle.
        let usage = tracker.collect(&net_dev(50, 60), at(1020)).unwrap();
        assert!(!usage.rates.contains_key("eth0"));

        // Rates resume from the new baseline.
        let usage = tracker.collect(&net_dev(150, 160), at(1030)).unwrap();
        let eth0 = &usage.rates["eth0"];
        assert!((eth0.rx_bytes_per_sec - 10.0).abs() < 1e-9);
        assert!((eth0.tx_bytes_per_sec - 10.0).abs() < 1e-9);
    }

    #[test]
    fn freebsd_path_also_divides_by_interval() {
        let row =
            |ibytes: u64, obytes: u64| format!("em0 1500 <Link#1> 00:aa 100 0 {ibytes} 90 0 {obytes} 0 0 0\n");
        let mut tracker = NetworkTracker::new(Platform::FreeBsd);
        tracker.collect(&row(1000, 2000), at(2000)).unwrap();

        let usage = tracker.collect(&row(1500, 2600), at(2005)).unwrap();
        let em0 = &usage.rates["em0"];
        assert!((em0.rx_bytes_per_sec - 100.0).abs() < 1e-9);
        assert!((em0.tx_bytes_per_sec - 120.0).abs() < 1e-9);
    }

    #[test]
    fn darwin_is_unsupported() {
        let mut tracker = NetworkTracker::new(Platform::Darwin);
        let err = tracker.collect("", at(0)).unwrap_err();
        assert!(matches!(
            err,
            CheckError::UnsupportedPlatform(Platform::Darwin)
        ));
    }
}
