//! One report run: collect, aggregate, diff, order, render

use std::io::Write;
use tracing::debug;

use crate::aggregate::aggregate;
use crate::cli::OutputFormat;
use crate::config::{ProcessSelection, ReportConfig};
use crate::csv_output::CsvOutput;
use crate::delta::compute_delta;
use crate::error::Result;
use crate::json_output::JsonOutput;
use crate::pids::{expand_threads, PgrepPids};
use crate::procfs::ProcFs;
use crate::report::{assemble, write_text, ReportRow};
use crate::snapshot::Snapshot;

type PidStream = Box<dyn Iterator<Item = Result<u32>>>;

fn pid_stream(config: &ReportConfig, procfs: &ProcFs) -> Result<Option<PidStream>> {
    let pids: PidStream = match &config.selection {
        ProcessSelection::Global => return Ok(None),
        ProcessSelection::Pattern(pattern) => Box::new(PgrepPids::spawn(pattern)?),
        ProcessSelection::Pids(pids) => Box::new(pids.clone().into_iter().map(Ok)),
    };
    if config.threads {
        return Ok(Some(Box::new(expand_threads(procfs.clone(), pids))));
    }
    Ok(Some(pids))
}

/// Aggregate every sample selected by `config` into a cumulative snapshot
pub fn collect(config: &ReportConfig) -> Result<Snapshot> {
    let procfs = ProcFs::new(&config.proc_root);
    match pid_stream(config, &procfs)? {
        None => {
            debug!("reading system-wide latency_stats");
            aggregate(procfs.global_lines()?, config.key_policy)
        }
        Some(pids) => aggregate(procfs.processes(pids), config.key_policy),
    }
}

/// Produce the report rows for `config`
///
/// Nothing is persisted unless the whole input was aggregated successfully.
pub fn run(config: &ReportConfig) -> Result<Vec<ReportRow>> {
    ProcFs::new(&config.proc_root).check_enabled()?;
    let current = collect(config)?;
    let shown = compute_delta(current, config.state_path.as_deref())?;
    Ok(assemble(&shown, &config.report))
}

/// Write `rows` in the configured output format
pub fn render<W: Write>(config: &ReportConfig, rows: &[ReportRow], out: &mut W) -> Result<()> {
    match config.format {
        OutputFormat::Text => write_text(out, rows, config.headers)?,
        OutputFormat::Json => writeln!(out, "{}", JsonOutput::from_rows(rows).to_json()?)?,
        OutputFormat::Csv => {
            let mut csv = CsvOutput::new(config.headers);
            for row in rows {
                csv.add_row(row.clone());
            }
            write!(out, "{}", csv.to_csv())?;
        }
    }
    out.flush()?;
    Ok(())
}
