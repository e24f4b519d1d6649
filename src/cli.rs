//! CLI argument parsing for latencyq

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::key::GroupingPolicy;
use crate::procfs::DEFAULT_PROC_ROOT;
use crate::report::OrderField;

/// Output format for latency reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated text table (default)
    #[default]
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "latencyq")]
#[command(version)]
#[command(about = "Linux latencytop simple stats", long_about = None)]
pub struct Cli {
    /// Process name regex (see pgrep -f); without it /proc/latency_stats (global) is used
    #[arg(value_name = "PROCNAME")]
    pub procname: Option<String>,

    /// Explicit process ID to read (repeatable, instead of PROCNAME)
    #[arg(short = 'p', long = "pid", value_name = "PID")]
    pub pids: Vec<u32>,

    /// Metric to order by
    #[arg(short = 'o', long = "orderby", value_enum, default_value = "max")]
    pub orderby: OrderField,

    /// Reduce backtraces before grouping
    #[arg(short = 'g', long = "group", value_enum)]
    pub group: Option<GroupingPolicy>,

    /// Use only the syscall from the backtrace (same as --group sys)
    #[arg(short = 's', long = "only-sys")]
    pub only_sys: bool,

    /// Also use the process name in the key
    #[arg(short = 'c', long = "show-cmd")]
    pub show_cmd: bool,

    /// Omit headers
    #[arg(short = 'n', long = "no-headers")]
    pub no_headers: bool,

    /// Limit output to the last LIMIT lines (0 = no limit)
    #[arg(short = 'l', long = "limit", value_name = "LIMIT", default_value = "0")]
    pub limit: usize,

    /// Also expand threads (LWPs) of matched processes
    #[arg(short = 't', long = "threads")]
    pub threads: bool,

    /// Show deltas against the snapshot stored in STATE, then update it
    #[arg(short = 'd', long = "delta", value_name = "STATE")]
    pub delta: Option<PathBuf>,

    /// Keep rows whose count is zero
    #[arg(short = 'z', long = "show-zeroes")]
    pub show_zeroes: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Root of the procfs tree
    #[arg(long = "proc-root", value_name = "DIR", default_value = DEFAULT_PROC_ROOT)]
    pub proc_root: PathBuf,

    /// Enable debug tracing to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
