//! Error taxonomy for latency aggregation
//!
//! Fatal conditions (malformed input, conflicting configuration, disabled
//! collection) abort the run. `MissingSource` is recoverable: readers skip the
//! process that vanished and keep going.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while collecting, aggregating or persisting latency data
#[derive(Error, Debug)]
pub enum LatencyError {
    #[error("malformed latency line ({reason}): {line:?}")]
    MalformedInput { line: String, reason: String },

    #[error("latency source not found: {}", .path.display())]
    MissingSource { path: PathBuf },

    #[error("conflicting options: {0}")]
    ConflictingConfiguration(String),

    #[error(
        "latencytop collection not enabled ({}), do:\nsudo sysctl -w kernel.latencytop=1",
        .path.display()
    )]
    CollectionDisabled { path: PathBuf },

    #[error("invalid state file {}: {reason}", .path.display())]
    InvalidState { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LatencyError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line: line.to_string(),
            reason: reason.into(),
        }
    }

    /// True for conditions a reader may skip without failing the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingSource { .. })
    }
}

/// Result type for latency operations
pub type Result<T> = std::result::Result<T, LatencyError>;
