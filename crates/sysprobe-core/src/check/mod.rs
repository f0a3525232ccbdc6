//! Metric checks: one parser per metric family.
//!
//! Each check is a synchronous transformation of already-captured tool
//! output into a typed record. Checks never invoke anything themselves;
//! the text reaches them through the collector. All checks except the
//! network tracker are pure functions of their input plus the platform
//! fixed at construction; the tracker carries the per-interface counter
//! baselines for the life of the process.
//!
//! Failure strata:
//! 1. invocation failure / unsupported platform — the whole family fails
//!    with a [`CheckError`], other families are unaffected;
//! 2. a single row fails conversion — dropped and recorded as a
//!    [`RowSkip`], the rest of the record is still produced;
//! 3. an optional field is absent — a default (`0` or `None`) is applied.

pub mod cpu;
pub mod disk;
pub mod io;
pub mod load;
pub mod memory;
pub mod network;
pub mod process;
pub mod tabular;

use std::fmt;

use crate::platform::Platform;

pub use cpu::{CpuCheck, CpuUtilization};
pub use disk::{DiskCheck, DiskUsage, VolumeUsage};
pub use io::{DeviceIoStats, IoCheck};
pub use load::{LoadAverage, collect_load_average};
pub use memory::{MemorySample, MemoryUsage, collect_memory};
pub use network::{InterfaceCounters, InterfaceRate, NetworkTracker, NetworkUsage};
pub use process::parse_process_list;
pub use tabular::{TableScan, parse_table};

/// Whole-family failure for one metric check.
#[derive(Debug)]
pub enum CheckError {
    /// The underlying tool could not be run or produced no output.
    Invocation(std::io::Error),
    /// No parsing branch exists for this platform.
    UnsupportedPlatform(Platform),
    /// The expected header or summary line could not be located.
    MissingHeader(&'static str),
    /// Output did not have the shape the platform branch requires.
    Malformed(String),
    /// Two samples share a timestamp; a rate is undefined.
    ZeroInterval,
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::Invocation(e) => write!(f, "tool invocation failed: {}", e),
            CheckError::UnsupportedPlatform(p) => write!(f, "unsupported platform '{}'", p),
            CheckError::MissingHeader(what) => write!(f, "missing {} line", what),
            CheckError::Malformed(msg) => write!(f, "malformed output: {}", msg),
            CheckError::ZeroInterval => write!(f, "zero sampling interval"),
        }
    }
}

impl std::error::Error for CheckError {}

impl From<std::io::Error> for CheckError {
    fn from(e: std::io::Error) -> Self {
        CheckError::Invocation(e)
    }
}

/// Why a single row was dropped from an otherwise good batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Pseudo filesystem row (`none` device, `map auto_home` and friends).
    SyntheticVolume,
    /// A designated numeric column did not parse as an integer.
    NonNumericField { column: usize },
    /// The row had fewer fields than the layout requires.
    MissingColumns { expected: usize, found: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::SyntheticVolume => write!(f, "synthetic filesystem"),
            SkipReason::NonNumericField { column } => {
                write!(f, "non-numeric value in column {}", column)
            }
            SkipReason::MissingColumns { expected, found } => {
                write!(f, "expected {} columns, found {}", expected, found)
            }
        }
    }
}

/// Per-row skip diagnostic, accumulated instead of raised.
///
/// `line` is the 0-based index into the original text, header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSkip {
    pub line: usize,
    pub reason: SkipReason,
}
