//! JSON output format for latency reports
//!
//! `--format json` implementation

use serde::Serialize;

use crate::report::ReportRow;

/// A single aggregated latency bucket
#[derive(Debug, Clone, Serialize)]
pub struct JsonRow {
    /// Aggregation key (backtrace, frame or syscall, maybe `comm:`-prefixed)
    pub key: String,
    pub count: i64,
    pub sum: i64,
    pub max: i64,
    /// Average latency; null when the bucket is empty
    pub avg: Option<f64>,
}

/// Root JSON output structure
#[derive(Debug, Clone, Default, Serialize)]
pub struct JsonOutput {
    /// latencyq version that produced the report
    pub version: String,
    /// Rows in report order (ascending by the order field)
    pub rows: Vec<JsonRow>,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut output = Self::new();
        for row in rows {
            output.add_row(row);
        }
        output
    }

    pub fn add_row(&mut self, row: &ReportRow) {
        self.rows.push(JsonRow {
            key: row.key.clone(),
            count: row.count,
            sum: row.sum,
            max: row.max,
            avg: row.avg_value(),
        });
    }

    /// Serialize to a pretty-printed JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
