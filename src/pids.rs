//! Process discovery for per-process mode
//!
//! PIDs come from `pgrep -f <pattern>` (read as the child produces them) or
//! from an explicit list, optionally expanded into thread IDs.

use nix::unistd::{getpid, getppid};
use std::io::{self, BufRead, BufReader, Lines};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::{debug, warn};

use crate::error::{LatencyError, Result};
use crate::procfs::ProcFs;

/// Stream of PIDs matching a `pgrep -f` pattern
///
/// Skips this process and its parent, both of which usually match a pattern
/// given on their own command line.
pub struct PgrepPids {
    child: Option<Child>,
    lines: Lines<BufReader<ChildStdout>>,
    exclude: [u32; 2],
}

impl PgrepPids {
    /// Start `pgrep -f pattern`
    pub fn spawn(pattern: &str) -> Result<Self> {
        let mut child = Command::new("pgrep")
            .arg("-f")
            .arg(pattern)
            .stdout(Stdio::piped())
            .stdin(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("pgrep stdout not captured"))?;
        debug!("spawned pgrep -f {:?}", pattern);
        Ok(Self {
            child: Some(child),
            lines: BufReader::new(stdout).lines(),
            exclude: [getpid().as_raw() as u32, getppid().as_raw() as u32],
        })
    }

    /// pgrep exits 1 when nothing matched; only higher codes are failures
    fn reap(&mut self) -> Option<Result<u32>> {
        let mut child = self.child.take()?;
        match child.wait() {
            Ok(status) if status.code().is_some_and(|code| code > 1) => {
                Some(Err(LatencyError::Io(io::Error::other(format!(
                    "pgrep failed with {status}"
                )))))
            }
            Ok(_) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

impl Iterator for PgrepPids {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e.into())),
                None => return self.reap(),
            };
            match line.trim().parse::<u32>() {
                Ok(pid) if self.exclude.contains(&pid) => continue,
                Ok(pid) => return Some(Ok(pid)),
                Err(_) => warn!("ignoring unexpected pgrep output {:?}", line),
            }
        }
    }
}

impl Drop for PgrepPids {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Replace each PID by the IDs of its threads
pub fn expand_threads<I>(procfs: ProcFs, pids: I) -> impl Iterator<Item = Result<u32>>
where
    I: IntoIterator<Item = Result<u32>>,
{
    pids.into_iter().flat_map(move |pid| {
        let tids: Vec<Result<u32>> = match pid.and_then(|pid| procfs.thread_ids(pid)) {
            Ok(tids) => tids.into_iter().map(Ok).collect(),
            Err(e) => vec![Err(e)],
        };
        tids
    })
}
