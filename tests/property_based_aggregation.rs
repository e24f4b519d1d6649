//! Property-based tests for the aggregation core
//!
//! Covers merge order independence, the avg invariant, delta idempotence,
//! report truncation and state-file round trips.

use latencyq::aggregate::{aggregate, LabeledLine};
use latencyq::delta::{compute_delta, diff};
use latencyq::key::{GroupingPolicy, KeyPolicy};
use latencyq::record::MetricRecord;
use latencyq::report::{assemble, OrderField, ReportOptions};
use latencyq::snapshot::Snapshot;
use proptest::prelude::*;

fn sample_lines() -> impl Strategy<Value = Vec<(u32, u32, u32, String)>> {
    prop::collection::vec(
        (
            0u32..1000,
            0u32..1_000_000,
            0u32..100_000,
            prop::sample::select(vec![
                "a SyS_read".to_string(),
                "b c SyS_write".to_string(),
                "d e f".to_string(),
                "g".to_string(),
            ]),
        ),
        1..40,
    )
}

fn to_lines(samples: &[(u32, u32, u32, String)]) -> Vec<latencyq::Result<LabeledLine>> {
    samples
        .iter()
        .map(|(c, s, m, bt)| Ok(("GLOBAL".to_string(), format!("{c} {s} {m} {bt}"))))
        .collect()
}

fn counters(snapshot: &Snapshot) -> Vec<(String, (i64, i64, i64))> {
    snapshot
        .iter()
        .map(|(k, r)| (k.clone(), r.counters()))
        .collect()
}

fn record() -> impl Strategy<Value = MetricRecord> {
    (0i64..10_000, 0i64..10_000_000, 0i64..100_000).prop_map(|(c, s, m)| MetricRecord::new(c, s, m))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_reordering_lines_never_changes_snapshot(samples in sample_lines()) {
        let policy = KeyPolicy::new(GroupingPolicy::Sys, false);
        let forward = aggregate(to_lines(&samples), policy).unwrap();
        let mut reversed = samples.clone();
        reversed.reverse();
        let backward = aggregate(to_lines(&reversed), policy).unwrap();
        prop_assert_eq!(counters(&forward), counters(&backward));
    }

    #[test]
    fn prop_avg_matches_sum_over_count(samples in sample_lines()) {
        let snapshot = aggregate(to_lines(&samples), KeyPolicy::default()).unwrap();
        for (_, r) in &snapshot {
            if r.count > 0 {
                prop_assert!((r.avg - r.sum as f64 / r.count as f64).abs() < 1e-9);
            } else {
                prop_assert!(r.avg.is_nan());
            }
        }
    }

    #[test]
    fn prop_merge_commutative(a in record(), b in record()) {
        let mut ab = a;
        ab.merge(&b);
        let mut ba = b;
        ba.merge(&a);
        prop_assert_eq!(ab.counters(), ba.counters());
    }

    #[test]
    fn prop_merge_associative(a in record(), b in record(), c in record()) {
        let mut left = a;
        left.merge(&b);
        left.merge(&c);

        let mut bc = b;
        bc.merge(&c);
        let mut right = a;
        right.merge(&bc);

        prop_assert_eq!(left.counters(), right.counters());
    }

    #[test]
    fn prop_diff_against_self_is_all_zero(samples in sample_lines()) {
        let snapshot = aggregate(to_lines(&samples), KeyPolicy::default()).unwrap();
        let d = diff(&snapshot, &snapshot);
        prop_assert_eq!(d.len(), snapshot.len());
        for (_, r) in &d {
            prop_assert_eq!(r.count, 0);
            prop_assert!(r.avg.is_nan());
        }
        let rows = assemble(&d, &ReportOptions::default());
        prop_assert!(rows.is_empty());
    }

    #[test]
    fn prop_limit_keeps_largest(maxes in prop::collection::hash_set(0i64..1_000_000, 1..30), limit in 1usize..10) {
        let snapshot: Snapshot = maxes
            .iter()
            .map(|m| (format!("k{m}"), MetricRecord::new(1, 1, *m)))
            .collect();
        let rows = assemble(&snapshot, &ReportOptions { order: OrderField::Max, limit, show_zeroes: false });

        let mut expected: Vec<i64> = maxes.iter().copied().collect();
        expected.sort_unstable();
        let expected: Vec<i64> = expected.into_iter().rev().take(limit).rev().collect();
        let got: Vec<i64> = rows.iter().map(|r| r.max).collect();
        prop_assert_eq!(got, expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_state_round_trip(samples in sample_lines()) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let snapshot = aggregate(to_lines(&samples), KeyPolicy::new(GroupingPolicy::Top, true)).unwrap();

        let shown = compute_delta(snapshot.clone(), Some(path.as_path())).unwrap();
        prop_assert_eq!(counters(&shown), counters(&snapshot));

        let loaded = Snapshot::load(&path).unwrap().unwrap();
        prop_assert_eq!(counters(&loaded), counters(&snapshot));
    }
}
