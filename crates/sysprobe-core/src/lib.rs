//! sysprobe-core — host metrics text-parsing engine.
//!
//! Turns the free-form text emitted by platform-native diagnostic tools
//! (`df`, `mpstat`, `iostat`, `top`, `vmstat`, `netstat`, `ps`, `/proc`
//! pseudo-files) into a normalized numeric snapshot.
//!
//! Provides:
//! - `check` — one parser per metric family (disk, io, cpu, memory,
//!   load, network, processes) plus the shared tabular tokenizer
//! - `collector` — per-cycle driver that runs every check and isolates
//!   per-family failures
//! - `platform` — closed set of supported target platforms
//! - `runner` / `fsread` — the seams through which tool invocation and
//!   `/proc` reads are supplied (real or mock)

pub mod check;
pub mod collector;
pub mod fsread;
pub mod platform;
pub mod runner;

pub use check::CheckError;
pub use collector::{Collector, Snapshot};
pub use platform::Platform;
