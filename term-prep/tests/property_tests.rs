//! Property-based tests for term-prep.
//!
//! These use proptest to check the invariants the profiling and pipeline
//! building blocks must keep for arbitrary inputs:
//!
//! - `OnlineStats` agrees with the two-pass mean and sample variance
//! - `BoundedUniqueTracker` never grows past its key budget
//! - `Histogram` keeps every value inside its bins, with the range ends in
//!   the first and last bin
//! - adjacent `Split` ranges partition their upstream
//! - `ClassSampler` emits exactly its target per class

use std::collections::BTreeMap;

use proptest::prelude::*;
use term_prep::analyzers::{BoundedUniqueTracker, Histogram, OnlineStats};
use term_prep::pipeline::{collect_rows, ClassSampler, MemorySource, SamplingStrategy, Split};

fn two_pass(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = if values.len() > 1 {
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    (mean, variance)
}

fn indexed_rows(n: usize) -> Vec<Vec<f64>> {
    (0..n).map(|i| vec![i as f64]).collect()
}

proptest! {
    /// Incremental statistics match the batch formulas.
    #[test]
    fn test_online_stats_match_two_pass(values in prop::collection::vec(-1.0e6..1.0e6f64, 1..1000)) {
        let mut stats = OnlineStats::new();
        for &x in &values {
            stats.add(x);
        }
        let (mean, variance) = two_pass(&values);
        let scale = 1.0 + variance.abs();

        prop_assert_eq!(stats.count(), values.len() as u64);
        prop_assert!((stats.mean() - mean).abs() < 1e-6);
        prop_assert!((stats.variance() - variance).abs() / scale < 1e-8);
        prop_assert_eq!(stats.min(), values.iter().copied().fold(f64::INFINITY, f64::min));
        prop_assert_eq!(stats.max(), values.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    }

    /// A constant sequence has zero variance.
    #[test]
    fn test_constant_values_have_zero_variance(x in -1.0e3..1.0e3f64, n in 1usize..500) {
        let mut stats = OnlineStats::new();
        for _ in 0..n {
            stats.add(x);
        }
        prop_assert!(stats.variance().abs() < 1e-9);
        prop_assert!((stats.mean() - x).abs() < 1e-9);
    }

    /// The tracker never stores more keys than its budget and is frozen once
    /// full.
    #[test]
    fn test_unique_tracker_respects_budget(
        keys in prop::collection::vec("[a-z]{1,6}", 0..300),
        budget in 1usize..50
    ) {
        let mut tracker = BoundedUniqueTracker::new(budget, 64 * 1024);
        for key in &keys {
            let before = tracker.size();
            let was_full = tracker.is_full();
            tracker.add(key);
            prop_assert!(tracker.size() <= budget);
            if was_full {
                prop_assert_eq!(tracker.size(), before);
            }
        }
        let distinct: std::collections::BTreeSet<&String> = keys.iter().collect();
        prop_assert_eq!(tracker.size(), distinct.len().min(budget));
    }

    /// Every value inside the range lands in a valid bin; the range ends go to
    /// the first and last bins.
    #[test]
    fn test_histogram_bins_in_range(
        min in -1.0e3..1.0e3f64,
        width in 0.0..1.0e3f64,
        bins in 1usize..64,
        fractions in prop::collection::vec(0.0..=1.0f64, 0..100)
    ) {
        let max = min + width;
        let mut hist = Histogram::new(min, max, bins).unwrap();
        for f in &fractions {
            let value = (min + f * width).min(max);
            let index = hist.bin_index(value);
            prop_assert!(index < bins);
            hist.add(value);
        }
        prop_assert_eq!(hist.total(), fractions.len() as u64);
        prop_assert_eq!(hist.bin_index(min), 0);
        if max > min {
            prop_assert_eq!(hist.bin_index(max), bins - 1);
        } else {
            prop_assert_eq!(hist.bin_index(max), 0);
        }
    }

    /// `[0, p)` and `[p, 100)` together emit every upstream row exactly once,
    /// in order.
    #[test]
    fn test_adjacent_splits_partition(rows in 0usize..3000, percent in 1u32..100) {
        let cut = f64::from(percent);
        let mut head = Split::new(MemorySource::new(indexed_rows(rows)), 0.0, cut).unwrap();
        let mut tail = Split::new(MemorySource::new(indexed_rows(rows)), cut, 100.0).unwrap();

        let mut joined = collect_rows(&mut head, 128).unwrap();
        joined.extend(collect_rows(&mut tail, 97).unwrap());
        prop_assert_eq!(joined, indexed_rows(rows));
    }

    /// Resampling emits `target` rows of every class, spread evenly over the
    /// rows of smaller classes.
    #[test]
    fn test_sampler_emits_target_per_class(
        counts in prop::collection::vec(1u64..60, 1..5),
        strategy in prop_oneof![
            Just(SamplingStrategy::Undersample),
            Just(SamplingStrategy::Oversample),
            Just(SamplingStrategy::Uniform),
        ]
    ) {
        // rows carry (position within class, class label)
        let mut rows = Vec::new();
        for (class, &count) in counts.iter().enumerate() {
            for i in 0..count {
                rows.push(vec![i as f64, (class + 1) as f64]);
            }
        }
        let mut class_counts = vec![0];
        class_counts.extend(counts.iter().copied());

        let mut sampler = ClassSampler::new(
            MemorySource::new(rows),
            strategy,
            1,
            &class_counts,
            17,
        )
        .unwrap();
        let target = sampler.target();
        let out = collect_rows(&mut sampler, 50).unwrap();

        let mut per_class: BTreeMap<u64, u64> = BTreeMap::new();
        let mut per_row: BTreeMap<(u64, u64), u64> = BTreeMap::new();
        for row in &out {
            *per_class.entry(row[1] as u64).or_insert(0) += 1;
            *per_row.entry((row[1] as u64, row[0] as u64)).or_insert(0) += 1;
        }
        prop_assert_eq!(out.len() as u64, target * counts.len() as u64);
        for class in 1..=counts.len() as u64 {
            prop_assert_eq!(per_class.get(&class).copied().unwrap_or(0), target);
            let copies: Vec<u64> = per_row
                .iter()
                .filter(|((c, _), _)| *c == class)
                .map(|(_, n)| *n)
                .collect();
            if let (Some(lo), Some(hi)) = (copies.iter().min(), copies.iter().max()) {
                prop_assert!(hi - lo <= 1);
            }
        }
    }
}
