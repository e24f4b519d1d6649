//! latencyq - non-UI reporter for Linux latencytop statistics
//!
//! Aggregates the kernel's per-process (`/proc/<pid>/latency`) or
//! system-wide (`/proc/latency_stats`) latency samples into a ranked report
//! of where time is lost, grouped by backtrace, frame or syscall, optionally
//! as a delta against a snapshot stored by a previous run.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod delta;
pub mod error;
pub mod json_output;
pub mod key;
pub mod pids;
pub mod procfs;
pub mod record;
pub mod report;
pub mod runner;
pub mod snapshot;

pub use error::{LatencyError, Result};
