//! CSV output format for latency reports
//!
//! `--format csv` for spreadsheet analysis and machine parsing

use crate::report::ReportRow;

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    rows: Vec<ReportRow>,
    include_header: bool,
}

impl CsvOutput {
    pub fn new(include_header: bool) -> Self {
        Self {
            rows: Vec::new(),
            include_header,
        }
    }

    pub fn add_row(&mut self, row: ReportRow) {
        self.rows.push(row);
    }

    fn header() -> &'static str {
        "count,sum,max,avg,key"
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(row: &ReportRow) -> String {
        let avg = row
            .avg_value()
            .map(|avg| format!("{:.3}", avg))
            .unwrap_or_default();
        format!(
            "{},{},{},{},{}",
            row.count,
            row.sum,
            row.max,
            avg,
            Self::escape_field(&row.key)
        )
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        if self.include_header {
            output.push_str(Self::header());
            output.push('\n');
        }

        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, count: i64, sum: i64, max: i64) -> ReportRow {
        let avg = if count == 0 {
            f64::NAN
        } else {
            sum as f64 / count as f64
        };
        ReportRow {
            key: key.to_string(),
            count,
            sum,
            max,
            avg,
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let mut csv = CsvOutput::new(true);
        csv.add_row(row("SyS_read", 4, 100, 50));
        assert_eq!(csv.to_csv(), "count,sum,max,avg,key\n4,100,50,25.000,SyS_read\n");
    }

    #[test]
    fn test_csv_without_header() {
        let mut csv = CsvOutput::new(false);
        csv.add_row(row("k", 1, 1, 1));
        assert!(!csv.to_csv().contains("count,sum"));
    }

    #[test]
    fn test_csv_nan_avg_is_empty_field() {
        let mut csv = CsvOutput::new(false);
        csv.add_row(row("idle", 0, 0, 3));
        assert_eq!(csv.to_csv(), "0,0,3,,idle\n");
    }

    #[test]
    fn test_csv_escapes_keys() {
        assert_eq!(CsvOutput::escape_field("a,b"), "\"a,b\"");
        assert_eq!(CsvOutput::escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(CsvOutput::escape_field("plain"), "plain");
    }
}
