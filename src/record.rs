//! Per-key latency metrics
//!
//! Counters are signed: a delta against a baseline taken before a process
//! restarted can go negative, and that is reported as-is.

/// Aggregated latency metrics for one key
///
/// `avg` is always recomputed from `sum` and `count`, never averaged
/// incrementally. It is NaN when `count == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord {
    /// Number of latency events
    pub count: i64,
    /// Cumulative latency (kernel units, usecs)
    pub sum: i64,
    /// Largest single latency observed
    pub max: i64,
    /// `sum / count`, NaN for empty records
    pub avg: f64,
}

fn average(sum: i64, count: i64) -> f64 {
    if count == 0 {
        f64::NAN
    } else {
        sum as f64 / count as f64
    }
}

impl Default for MetricRecord {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl MetricRecord {
    /// Build a record from raw counters
    pub fn new(count: i64, sum: i64, max: i64) -> Self {
        Self {
            count,
            sum,
            max,
            avg: average(sum, count),
        }
    }

    /// Re-establish `avg == sum / count`
    pub fn refresh_avg(&mut self) {
        self.avg = average(self.sum, self.count);
    }

    /// Fold another record for the same key into this one
    pub fn merge(&mut self, incoming: &MetricRecord) {
        self.count = self.count.saturating_add(incoming.count);
        self.sum = self.sum.saturating_add(incoming.sum);
        self.max = self.max.max(incoming.max);
        self.refresh_avg();
    }

    /// Counters accumulated since `baseline`
    ///
    /// `max` keeps the current value: the kernel's max is not an accumulator,
    /// so there is no meaningful difference to take.
    pub fn subtract(&self, baseline: &MetricRecord) -> MetricRecord {
        MetricRecord::new(
            self.count.saturating_sub(baseline.count),
            self.sum.saturating_sub(baseline.sum),
            self.max,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.count == 0
    }

    /// Counters only, for comparisons that must ignore NaN
    pub fn counters(&self) -> (i64, i64, i64) {
        (self.count, self.sum, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_avg() {
        let r = MetricRecord::new(4, 100, 40);
        assert_eq!(r.avg, 25.0);
    }

    #[test]
    fn test_empty_record_avg_is_nan() {
        let r = MetricRecord::new(0, 0, 0);
        assert!(r.avg.is_nan());
        assert!(MetricRecord::default().avg.is_nan());
    }

    #[test]
    fn test_merge_accumulates_and_keeps_max() {
        let mut r = MetricRecord::new(2, 30, 20);
        r.merge(&MetricRecord::new(3, 70, 15));
        assert_eq!(r.counters(), (5, 100, 20));
        assert_eq!(r.avg, 20.0);
    }

    #[test]
    fn test_merge_recomputes_avg_not_average_of_averages() {
        // avg(10) and avg(1000) averaged would be 505
        let mut r = MetricRecord::new(1, 10, 10);
        r.merge(&MetricRecord::new(9, 9000, 1000));
        assert_eq!(r.avg, 901.0);
    }

    #[test]
    fn test_merge_into_default_matches_incoming() {
        let mut r = MetricRecord::default();
        r.merge(&MetricRecord::new(3, 9, 5));
        assert_eq!(r.counters(), (3, 9, 5));
        assert_eq!(r.avg, 3.0);
    }

    #[test]
    fn test_subtract_delta() {
        let baseline = MetricRecord::new(10, 100, 5);
        let current = MetricRecord::new(15, 180, 7);
        let delta = current.subtract(&baseline);
        assert_eq!(delta.counters(), (5, 80, 7));
        assert_eq!(delta.avg, 16.0);
    }

    #[test]
    fn test_subtract_unchanged_is_zero_with_nan_avg() {
        let r = MetricRecord::new(10, 100, 5);
        let delta = r.subtract(&r);
        assert!(delta.is_zero());
        assert_eq!(delta.sum, 0);
        assert_eq!(delta.max, 5);
        assert!(delta.avg.is_nan());
    }

    #[test]
    fn test_subtract_after_counter_reset_goes_negative() {
        let baseline = MetricRecord::new(50, 5000, 300);
        let current = MetricRecord::new(5, 200, 90);
        let delta = current.subtract(&baseline);
        assert_eq!(delta.counters(), (-45, -4800, 90));
        assert!((delta.avg - 4800.0 / 45.0).abs() < 1e-9);
    }
}
