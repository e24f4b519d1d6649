//! Validated run configuration
//!
//! Collapses the overlapping CLI switches (`--group`, `--only-sys`,
//! `--show-cmd`) into one `KeyPolicy`, and rejects contradictory
//! combinations before any data is read.

use std::path::PathBuf;

use crate::cli::{Cli, OutputFormat};
use crate::error::{LatencyError, Result};
use crate::key::{GroupingPolicy, KeyPolicy};
use crate::procfs::DEFAULT_PROC_ROOT;
use crate::report::ReportOptions;

/// Where latency samples come from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProcessSelection {
    /// `latency_stats`, system-wide
    #[default]
    Global,
    /// Processes whose command line matches a `pgrep -f` pattern
    Pattern(String),
    /// Explicit process IDs
    Pids(Vec<u32>),
}

/// Everything a single report run needs
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub selection: ProcessSelection,
    pub threads: bool,
    pub key_policy: KeyPolicy,
    pub report: ReportOptions,
    pub headers: bool,
    pub format: OutputFormat,
    pub state_path: Option<PathBuf>,
    pub proc_root: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            selection: ProcessSelection::Global,
            threads: false,
            key_policy: KeyPolicy::default(),
            report: ReportOptions::default(),
            headers: true,
            format: OutputFormat::Text,
            state_path: None,
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
        }
    }
}

fn resolve_grouping(group: Option<GroupingPolicy>, only_sys: bool) -> Result<GroupingPolicy> {
    match (group, only_sys) {
        (Some(GroupingPolicy::Sys), true) | (None, true) => Ok(GroupingPolicy::Sys),
        (Some(other), true) => Err(LatencyError::ConflictingConfiguration(format!(
            "--only-sys cannot be combined with --group {}",
            format!("{other:?}").to_lowercase()
        ))),
        (Some(group), false) => Ok(group),
        (None, false) => Ok(GroupingPolicy::None),
    }
}

impl ReportConfig {
    /// Build and validate a configuration from parsed arguments
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let selection = match (&cli.procname, cli.pids.is_empty()) {
            (Some(_), false) => {
                return Err(LatencyError::ConflictingConfiguration(
                    "PROCNAME and --pid are mutually exclusive".to_string(),
                ))
            }
            (Some(pattern), true) => ProcessSelection::Pattern(pattern.clone()),
            (None, false) => ProcessSelection::Pids(cli.pids.clone()),
            (None, true) => ProcessSelection::Global,
        };

        let config = Self {
            selection,
            threads: cli.threads,
            key_policy: KeyPolicy::new(resolve_grouping(cli.group, cli.only_sys)?, cli.show_cmd),
            report: ReportOptions {
                order: cli.orderby,
                limit: cli.limit,
                show_zeroes: cli.show_zeroes,
            },
            headers: !cli.no_headers,
            format: cli.format,
            state_path: cli.delta.clone(),
            proc_root: cli.proc_root.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check option combinations that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.threads && self.selection == ProcessSelection::Global {
            return Err(LatencyError::ConflictingConfiguration(
                "--threads needs PROCNAME or --pid".to_string(),
            ));
        }
        if let ProcessSelection::Pattern(pattern) = &self.selection {
            if pattern.is_empty() {
                return Err(LatencyError::ConflictingConfiguration(
                    "PROCNAME must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
