//! Folding raw latencytop lines into a snapshot
//!
//! Each line of `/proc/latency_stats` or `/proc/<pid>/latency` reads
//!
//! ```text
//! <call_count> <cumulative_time> <max_time> <backtrace...>
//! ```
//!
//! Header lines (`Latency Top version : v0.1`) do not start with a digit and
//! are skipped.

use tracing::{debug, trace};

use crate::error::{LatencyError, Result};
use crate::key::KeyPolicy;
use crate::record::MetricRecord;
use crate::snapshot::Snapshot;

/// A `(label, raw line)` pair as produced by the procfs readers
pub type LabeledLine = (String, String);

/// One parsed latency line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub call_count: i64,
    pub cumulative_time: i64,
    pub max_time: i64,
    pub backtrace: String,
}

impl Sample {
    pub fn record(&self) -> MetricRecord {
        MetricRecord::new(self.call_count, self.cumulative_time, self.max_time)
    }
}

const COUNTER_FIELDS: [&str; 3] = ["call_count", "cumulative_time", "max_time"];

fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(match s.find(char::is_whitespace) {
        Some(end) => (&s[..end], &s[end..]),
        None => (s, ""),
    })
}

/// Parse one latency line
///
/// Returns `Ok(None)` for lines that do not start with a digit. A data line
/// with fewer than four fields or a non-numeric counter is `MalformedInput`.
pub fn parse_sample_line(line: &str) -> Result<Option<Sample>> {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(None);
    }

    let mut counters = [0i64; 3];
    let mut rest = line;
    for (slot, name) in counters.iter_mut().zip(COUNTER_FIELDS) {
        let (field, tail) = next_field(rest)
            .ok_or_else(|| LatencyError::malformed(line, format!("missing {name}")))?;
        let value: u64 = field.parse().map_err(|_| {
            LatencyError::malformed(line, format!("{name} is not an integer: {field:?}"))
        })?;
        *slot = i64::try_from(value)
            .map_err(|_| LatencyError::malformed(line, format!("{name} out of range")))?;
        rest = tail;
    }

    let backtrace = rest.trim();
    if backtrace.is_empty() {
        return Err(LatencyError::malformed(line, "missing backtrace"));
    }

    let [call_count, cumulative_time, max_time] = counters;
    Ok(Some(Sample {
        call_count,
        cumulative_time,
        max_time,
        backtrace: backtrace.to_string(),
    }))
}

/// Accumulates latency lines into a snapshot under one key policy
#[derive(Debug)]
pub struct Aggregator {
    policy: KeyPolicy,
    snapshot: Snapshot,
    lines: u64,
    skipped: u64,
}

impl Aggregator {
    pub fn new(policy: KeyPolicy) -> Self {
        Self {
            policy,
            snapshot: Snapshot::new(),
            lines: 0,
            skipped: 0,
        }
    }

    /// Merge one raw line attributed to `label`
    pub fn ingest(&mut self, label: &str, line: &str) -> Result<()> {
        let Some(sample) = parse_sample_line(line)? else {
            self.skipped += 1;
            trace!("skipping non-data line {:?}", line);
            return Ok(());
        };
        let key = self.policy.key(label, &sample.backtrace);
        self.snapshot.merge(key, &sample.record());
        self.lines += 1;
        Ok(())
    }

    pub fn finish(self) -> Snapshot {
        debug!(
            "aggregated {} lines ({} skipped) into {} keys",
            self.lines,
            self.skipped,
            self.snapshot.len()
        );
        self.snapshot
    }
}

/// Drain `lines` and return the complete snapshot
///
/// Pulls one line at a time, so slow producers (e.g. a `pgrep` pipe) are
/// fine. The first error stops the run; nothing partial is returned.
pub fn aggregate<I>(lines: I, policy: KeyPolicy) -> Result<Snapshot>
where
    I: IntoIterator<Item = Result<LabeledLine>>,
{
    let mut aggregator = Aggregator::new(policy);
    for item in lines {
        let (label, line) = item?;
        aggregator.ingest(&label, &line)?;
    }
    Ok(aggregator.finish())
}
