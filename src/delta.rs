//! Snapshot-diff against the previous run
//!
//! The state file always holds the *cumulative* snapshot of the last run.
//! It is written before the difference is taken, so repeated runs over idle
//! processes converge to all-zero deltas instead of drifting.

use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::snapshot::Snapshot;

/// Subtract `baseline` from `current`, key by key
///
/// Keys missing from the baseline are new since the last run and keep their
/// full value. Keys only in the baseline are dropped.
pub fn diff(current: &Snapshot, baseline: &Snapshot) -> Snapshot {
    current
        .iter()
        .map(|(key, record)| {
            let shown = match baseline.get(key) {
                Some(before) => record.subtract(before),
                None => *record,
            };
            (key.clone(), shown)
        })
        .collect()
}

/// Apply delta mode to a freshly aggregated snapshot
///
/// * no `state_path`: `current` is returned untouched and nothing is stored
/// * `state_path` absent on disk: `current` becomes the baseline and is
///   returned untouched
/// * `state_path` present: the old baseline is loaded, `current` replaces
///   it on disk, and the difference is returned for display
pub fn compute_delta(current: Snapshot, state_path: Option<&Path>) -> Result<Snapshot> {
    let Some(path) = state_path else {
        return Ok(current);
    };

    let baseline = Snapshot::load(path)?;
    current.save(path)?;

    match baseline {
        None => {
            debug!("no baseline at {}, recorded first snapshot", path.display());
            Ok(current)
        }
        Some(baseline) => Ok(diff(&current, &baseline)),
    }
}
