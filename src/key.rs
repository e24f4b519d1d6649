//! Aggregation key derivation from kernel backtraces
//!
//! latencytop reports each latency source as a space-separated call chain.
//! The key decides which bucket a sample lands in: the full chain, one end of
//! it, or the syscall entry point, optionally prefixed with the process name.

use clap::ValueEnum;
use regex::Regex;
use std::sync::LazyLock;

/// Frames that carry no information about where the time went
const NOISE_FRAMES: [&str; 2] = ["__refrigerator ", " system_call_fastpath"];

static SYSCALL_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^sys_[a-z][a-z0-9_]*$").expect("syscall frame pattern is valid")
});

/// How much of the backtrace forms the aggregation key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GroupingPolicy {
    /// Whole backtrace (after noise removal)
    #[default]
    None,
    /// Last frame of the backtrace
    Top,
    /// First frame of the backtrace
    Low,
    /// Syscall entry frame (e.g. SyS_write), falling back to the last frame
    Sys,
}

/// Grouping policy plus label inclusion, resolved before aggregation starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyPolicy {
    pub grouping: GroupingPolicy,
    pub include_label: bool,
}

impl KeyPolicy {
    pub fn new(grouping: GroupingPolicy, include_label: bool) -> Self {
        Self {
            grouping,
            include_label,
        }
    }

    /// Derive the bucket key for one sample
    pub fn key(&self, label: &str, backtrace: &str) -> String {
        normalize_key(label, backtrace, self.grouping, self.include_label)
    }
}

/// Remove frames that show up in nearly every backtrace
pub fn strip_noise(backtrace: &str) -> String {
    NOISE_FRAMES
        .iter()
        .fold(backtrace.to_string(), |acc, noise| acc.replace(noise, ""))
}

fn last_frame(backtrace: &str) -> &str {
    backtrace.split_whitespace().next_back().unwrap_or("")
}

fn first_frame(backtrace: &str) -> &str {
    backtrace.split_whitespace().next().unwrap_or("")
}

/// Last frame naming a syscall entry point, if any
fn syscall_frame(backtrace: &str) -> Option<&str> {
    backtrace
        .split_whitespace()
        .rev()
        .find(|frame| SYSCALL_FRAME.is_match(frame))
}

/// Reduce a backtrace according to the grouping policy
pub fn group_backtrace(backtrace: &str, grouping: GroupingPolicy) -> String {
    let cleaned = strip_noise(backtrace);
    let grouped = match grouping {
        GroupingPolicy::None => cleaned.as_str(),
        GroupingPolicy::Top => last_frame(&cleaned),
        GroupingPolicy::Low => first_frame(&cleaned),
        GroupingPolicy::Sys => syscall_frame(&cleaned).unwrap_or_else(|| last_frame(&cleaned)),
    };
    grouped.to_string()
}

/// Derive the aggregation key for a `(label, backtrace)` pair
///
/// Deterministic: baseline and current snapshots are joined on this key.
pub fn normalize_key(
    label: &str,
    backtrace: &str,
    grouping: GroupingPolicy,
    include_label: bool,
) -> String {
    let grouped = group_backtrace(backtrace, grouping);
    if include_label {
        format!("{}:{}", label, grouped)
    } else {
        grouped
    }
}
