//! Ordering, filtering and truncating the final snapshot
//!
//! Rows come out ascending by the chosen field, so the worst offenders sit
//! at the bottom of the listing, right above the shell prompt.

use clap::ValueEnum;
use std::cmp::Ordering;
use std::io::{self, Write};

use crate::record::MetricRecord;
use crate::snapshot::Snapshot;

/// Metric used to order report rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OrderField {
    /// Number of latency events
    Cnt,
    /// Cumulative latency
    Sum,
    /// Largest single latency
    #[default]
    Max,
    /// Average latency per event
    Avg,
}

impl OrderField {
    fn value(self, record: &MetricRecord) -> f64 {
        match self {
            OrderField::Cnt => record.count as f64,
            OrderField::Sum => record.sum as f64,
            OrderField::Max => record.max as f64,
            OrderField::Avg => record.avg,
        }
    }
}

/// Options controlling which rows are reported and in what order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOptions {
    pub order: OrderField,
    /// Keep only the last `limit` rows; 0 keeps everything
    pub limit: usize,
    pub show_zeroes: bool,
}

/// One rendered line of the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub key: String,
    pub count: i64,
    pub sum: i64,
    pub max: i64,
    pub avg: f64,
}

impl ReportRow {
    fn new(key: String, record: &MetricRecord) -> Self {
        Self {
            key,
            count: record.count,
            sum: record.sum,
            max: record.max,
            avg: record.avg,
        }
    }

    /// Average, or `None` when it is not a number
    pub fn avg_value(&self) -> Option<f64> {
        (!self.avg.is_nan()).then_some(self.avg)
    }
}

/// NaN sorts after every real number, regardless of its sign bit
fn compare_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(&b),
    }
}

/// Build the ordered report rows for `snapshot`
pub fn assemble(snapshot: &Snapshot, options: &ReportOptions) -> Vec<ReportRow> {
    let mut entries: Vec<(&String, &MetricRecord)> = snapshot
        .iter()
        .filter(|(_, record)| options.show_zeroes || !record.is_zero())
        .collect();

    // keys break ties so output is stable across runs
    entries.sort_by(|(ka, ra), (kb, rb)| {
        compare_nan_last(options.order.value(ra), options.order.value(rb)).then_with(|| ka.cmp(kb))
    });

    let skip = match options.limit {
        0 => 0,
        limit => entries.len().saturating_sub(limit),
    };

    entries
        .into_iter()
        .skip(skip)
        .map(|(key, record)| ReportRow::new(key.clone(), record))
        .collect()
}

fn format_avg(avg: f64) -> String {
    if avg.is_nan() {
        "nan".to_string()
    } else {
        format!("{:.1}", avg)
    }
}

/// Write the tab-separated text table
pub fn write_text<W: Write>(out: &mut W, rows: &[ReportRow], headers: bool) -> io::Result<()> {
    if headers {
        writeln!(
            out,
            "{:>6}\t{:>8}\t{:>8}\t{:>8}\t{}",
            "cnt", "sum", "max", "avg", "key"
        )?;
    }
    for row in rows {
        writeln!(
            out,
            "{:>6}\t{:>8}\t{:>8}\t{:>8}\t{}",
            row.count,
            row.sum,
            row.max,
            format_avg(row.avg),
            row.key
        )?;
    }
    Ok(())
}
