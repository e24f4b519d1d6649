//! Readers for the latencytop files under procfs
//!
//! - `<root>/sys/kernel/latencytop`: collection switch
//! - `<root>/latency_stats`: system-wide samples, labelled `GLOBAL`
//! - `<root>/<pid>/latency`: per-process samples, labelled with `<pid>/comm`
//!
//! Processes may exit between discovery and read; those are skipped quietly.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, ErrorKind, Lines};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::aggregate::LabeledLine;
use crate::error::{LatencyError, Result};

/// Label used for samples from `latency_stats`
pub const GLOBAL_LABEL: &str = "GLOBAL";

/// Default procfs mount point
pub const DEFAULT_PROC_ROOT: &str = "/proc";

fn is_data_line(line: &str) -> bool {
    line.starts_with(|c: char| c.is_ascii_digit())
}

/// Map "gone" errors to `MissingSource`, keep the rest as IO errors
fn classify(err: io::Error, path: &Path) -> LatencyError {
    let vanished = err.kind() == ErrorKind::NotFound
        || err.raw_os_error() == Some(nix::errno::Errno::ESRCH as i32);
    if vanished {
        LatencyError::MissingSource {
            path: path.to_path_buf(),
        }
    } else {
        LatencyError::Io(err)
    }
}

/// Handle on a procfs tree
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn switch_path(&self) -> PathBuf {
        self.root.join("sys/kernel/latencytop")
    }

    /// Fail with `CollectionDisabled` unless `kernel.latencytop` is non-zero
    pub fn check_enabled(&self) -> Result<()> {
        let path = self.switch_path();
        let enabled = fs::read_to_string(&path)
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .is_some_and(|v| v != 0);
        if enabled {
            Ok(())
        } else {
            Err(LatencyError::CollectionDisabled { path })
        }
    }

    /// Lazily read system-wide samples
    pub fn global_lines(&self) -> Result<GlobalLines> {
        let path = self.root.join("latency_stats");
        let file = File::open(&path).map_err(|e| classify(e, &path))?;
        Ok(GlobalLines {
            lines: BufReader::new(file).lines(),
        })
    }

    fn read_comm(&self, pid: u32) -> Result<String> {
        let path = self.root.join(pid.to_string()).join("comm");
        let comm = fs::read_to_string(&path).map_err(|e| classify(e, &path))?;
        Ok(comm.trim_end().to_string())
    }

    /// All data lines of one process, labelled with its command name
    pub fn process_lines(&self, pid: u32) -> Result<Vec<LabeledLine>> {
        let comm = self.read_comm(pid)?;
        let path = self.root.join(pid.to_string()).join("latency");
        let data = fs::read_to_string(&path).map_err(|e| classify(e, &path))?;
        let lines: Vec<LabeledLine> = data
            .lines()
            .map(str::trim_end)
            .filter(|line| is_data_line(line))
            .map(|line| (comm.clone(), line.to_string()))
            .collect();
        trace!("pid {} ({}): {} latency lines", pid, comm, lines.len());
        Ok(lines)
    }

    /// Thread IDs of `pid`, from `<root>/<pid>/task`
    ///
    /// A process that is already gone has no threads.
    pub fn thread_ids(&self, pid: u32) -> Result<Vec<u32>> {
        let path = self.root.join(pid.to_string()).join("task");
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) => {
                let err = classify(e, &path);
                if err.is_recoverable() {
                    debug!("skipping threads of vanished pid {}", pid);
                    return Ok(Vec::new());
                }
                return Err(err);
            }
        };
        let mut tids: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .collect();
        tids.sort_unstable();
        Ok(tids)
    }

    /// Lazily read samples of every PID produced by `pids`
    pub fn processes<I>(&self, pids: I) -> ProcessLines<I::IntoIter>
    where
        I: IntoIterator<Item = Result<u32>>,
    {
        ProcessLines {
            procfs: self.clone(),
            pids: pids.into_iter(),
            pending: Vec::new().into_iter(),
        }
    }
}

/// Iterator over `latency_stats` data lines
pub struct GlobalLines {
    lines: Lines<BufReader<File>>,
}

impl Iterator for GlobalLines {
    type Item = Result<LabeledLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    let line = line.trim_end();
                    if is_data_line(line) {
                        return Some(Ok((GLOBAL_LABEL.to_string(), line.to_string())));
                    }
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Iterator over the data lines of a stream of processes
///
/// Reads one process at a time; processes that vanished are skipped.
pub struct ProcessLines<I> {
    procfs: ProcFs,
    pids: I,
    pending: std::vec::IntoIter<LabeledLine>,
}

impl<I> Iterator for ProcessLines<I>
where
    I: Iterator<Item = Result<u32>>,
{
    type Item = Result<LabeledLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.pending.next() {
                return Some(Ok(line));
            }
            let pid = match self.pids.next()? {
                Ok(pid) => pid,
                Err(e) => return Some(Err(e)),
            };
            match self.procfs.process_lines(pid) {
                Ok(lines) => self.pending = lines.into_iter(),
                Err(e) if e.is_recoverable() => {
                    debug!("skipping pid {}: {}", pid, e);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_proc() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sys/kernel")).unwrap();
        fs::write(root.join("sys/kernel/latencytop"), "1\n").unwrap();
        fs::write(
            root.join("latency_stats"),
            "Latency Top version : v0.1\n3 30 20 a b SyS_read\n1 5 5 c SyS_write\n",
        )
        .unwrap();
        for (pid, comm, latency) in [
            (100, "apache2", "Latency Top version : v0.1\n2 40 30 x SyS_poll\n"),
            (200, "squid", "1 10 10 y SyS_epoll_wait\n"),
        ] {
            let p = root.join(pid.to_string());
            fs::create_dir_all(p.join("task").join(pid.to_string())).unwrap();
            fs::write(p.join("comm"), format!("{comm}\n")).unwrap();
            fs::write(p.join("latency"), latency).unwrap();
        }
        fs::create_dir_all(root.join("100/task/101")).unwrap();
        dir
    }

    #[test]
    fn test_check_enabled() {
        let dir = fake_proc();
        let procfs = ProcFs::new(dir.path());
        assert!(procfs.check_enabled().is_ok());

        fs::write(dir.path().join("sys/kernel/latencytop"), "0\n").unwrap();
        assert!(matches!(
            procfs.check_enabled(),
            Err(LatencyError::CollectionDisabled { .. })
        ));
    }

    #[test]
    fn test_check_enabled_missing_switch() {
        let dir = TempDir::new().unwrap();
        assert!(ProcFs::new(dir.path()).check_enabled().is_err());
    }

    #[test]
    fn test_global_lines_skip_header() {
        let dir = fake_proc();
        let lines: Vec<LabeledLine> = ProcFs::new(dir.path())
            .global_lines()
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], ("GLOBAL".to_string(), "3 30 20 a b SyS_read".to_string()));
    }

    #[test]
    fn test_process_lines_labelled_by_comm() {
        let dir = fake_proc();
        let lines = ProcFs::new(dir.path()).process_lines(100).unwrap();
        assert_eq!(lines, vec![("apache2".to_string(), "2 40 30 x SyS_poll".to_string())]);
    }

    #[test]
    fn test_vanished_process_is_missing_source() {
        let dir = fake_proc();
        let err = ProcFs::new(dir.path()).process_lines(999).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_processes_skip_vanished_pids() {
        let dir = fake_proc();
        let procfs = ProcFs::new(dir.path());
        let lines: Vec<LabeledLine> = procfs
            .processes(vec![Ok(100), Ok(999), Ok(200)])
            .collect::<Result<_>>()
            .unwrap();
        let labels: Vec<&str> = lines.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["apache2", "squid"]);
    }

    #[test]
    fn test_processes_propagate_pid_errors() {
        let dir = fake_proc();
        let procfs = ProcFs::new(dir.path());
        let mut iter = procfs.processes(vec![Err(LatencyError::Io(io::Error::other("pgrep")))]);
        assert!(matches!(iter.next(), Some(Err(LatencyError::Io(_)))));
    }

    #[test]
    fn test_thread_ids() {
        let dir = fake_proc();
        let procfs = ProcFs::new(dir.path());
        assert_eq!(procfs.thread_ids(100).unwrap(), vec![100, 101]);
        assert_eq!(procfs.thread_ids(200).unwrap(), vec![200]);
        assert!(procfs.thread_ids(999).unwrap().is_empty());
    }
}
