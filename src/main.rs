use anyhow::{Context, Result};
use clap::Parser;
use latencyq::{cli::Cli, config::ReportConfig, runner, LatencyError};
use std::io::{self, ErrorKind};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Closed stdout (e.g. piped into `head`) ends the run quietly
fn is_broken_pipe(err: &LatencyError) -> bool {
    matches!(err, LatencyError::Io(e) if e.kind() == ErrorKind::BrokenPipe)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    // Resolve conflicting grouping/selection flags before touching procfs
    let config = ReportConfig::from_cli(&args)?;

    let rows = runner::run(&config).with_context(|| {
        format!(
            "failed to build latency report from {}",
            config.proc_root.display()
        )
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match runner::render(&config, &rows, &mut out) {
        Err(e) if is_broken_pipe(&e) => Ok(()),
        other => Ok(other?),
    }
}
