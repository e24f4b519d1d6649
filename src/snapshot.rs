//! Key → metrics mapping, and its on-disk form for delta mode
//!
//! The state file is a small JSON document:
//!
//! ```text
//! {"version":1,"entries":[{"key":"SyS_read","count":10,"sum":100,"max":5}]}
//! ```
//!
//! `avg` is derived and never stored.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{LatencyError, Result};
use crate::record::MetricRecord;

/// Current state file format
pub const STATE_VERSION: u32 = 1;

/// Aggregated metrics for one run, keyed by normalized key
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: BTreeMap<String, MetricRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateEntry {
    key: String,
    count: i64,
    sum: i64,
    max: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    entries: Vec<StateEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `record` into the bucket for `key`, creating it if needed
    pub fn merge(&mut self, key: String, record: &MetricRecord) {
        self.records
            .entry(key)
            .and_modify(|existing| existing.merge(record))
            .or_insert(*record);
    }

    pub fn get(&self, key: &str) -> Option<&MetricRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, MetricRecord> {
        self.records.iter()
    }

    /// Load a persisted snapshot; `Ok(None)` when the file does not exist yet
    pub fn load(path: &Path) -> Result<Option<Snapshot>> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: StateFile =
            serde_json::from_str(&data).map_err(|e| LatencyError::InvalidState {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if state.version != STATE_VERSION {
            return Err(LatencyError::InvalidState {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported version {} (expected {})",
                    state.version, STATE_VERSION
                ),
            });
        }

        let snapshot: Snapshot = state
            .entries
            .into_iter()
            .map(|e| (e.key, MetricRecord::new(e.count, e.sum, e.max)))
            .collect();
        debug!(
            "loaded {} baseline entries from {}",
            snapshot.len(),
            path.display()
        );
        Ok(Some(snapshot))
    }

    /// Persist the snapshot, replacing any previous file atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let state = StateFile {
            version: STATE_VERSION,
            entries: self
                .records
                .iter()
                .map(|(key, r)| StateEntry {
                    key: key.clone(),
                    count: r.count,
                    sum: r.sum,
                    max: r.max,
                })
                .collect(),
        };

        let tmp = temp_path(path);
        fs::write(&tmp, serde_json::to_vec(&state)?)?;
        fs::rename(&tmp, path)?;
        debug!("stored {} entries to {}", self.len(), path.display());
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("latencyq-state"));
    name.push(".tmp");
    path.with_file_name(name)
}

impl FromIterator<(String, MetricRecord)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, MetricRecord)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (key, record) in iter {
            snapshot.merge(key, &record);
        }
        snapshot
    }
}

impl IntoIterator for Snapshot {
    type Item = (String, MetricRecord);
    type IntoIter = btree_map::IntoIter<String, MetricRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a MetricRecord);
    type IntoIter = btree_map::Iter<'a, String, MetricRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
