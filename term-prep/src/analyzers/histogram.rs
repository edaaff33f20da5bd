//! Fixed-bin histograms over a closed numeric range.

use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

/// Heuristic bin count for a column with `unique` distinct values.
///
/// `clamp(round(min(u, 100)^3 / 10000), min(u, 10), min(u, 100))`, never
/// less than one bin.
pub fn heuristic_bin_count(unique: usize) -> usize {
    let lo = unique.min(10);
    let hi = unique.min(100);
    let cubed = (hi as f64).powi(3) / 10_000.0;
    (cubed.round() as usize).clamp(lo, hi).max(1)
}

/// Frequency counts over `bin_count` equal-width bins spanning `[min, max]`.
///
/// When `min == max` the width is 1 and everything lands in bin 0. Values at
/// or beyond `max` are clamped into the last bin, values below `min` into the
/// first one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    min: f64,
    max: f64,
    bin_width: f64,
    counts: Vec<u64>,
}

impl Histogram {
    /// Creates an empty histogram. Fails on `min > max`, non-finite bounds or
    /// zero bins, which are programming errors rather than bad data.
    pub fn new(min: f64, max: f64, bin_count: usize) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) {
            return Err(PrepError::internal(format!(
                "histogram bounds must be finite, got [{min}, {max}]"
            )));
        }
        if min > max {
            return Err(PrepError::internal(format!(
                "histogram min {min} exceeds max {max}"
            )));
        }
        if bin_count == 0 {
            return Err(PrepError::internal("histogram needs at least one bin"));
        }
        let bin_width = if max > min {
            (max - min) / bin_count as f64
        } else {
            1.0
        };
        Ok(Self {
            min,
            max,
            bin_width,
            counts: vec![0; bin_count],
        })
    }

    /// Index of the bin `value` falls into.
    pub fn bin_index(&self, value: f64) -> usize {
        let raw = ((value - self.min) / self.bin_width).floor();
        if raw.is_nan() || raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.counts.len() - 1)
        }
    }

    /// Counts one occurrence of `value`.
    pub fn add(&mut self, value: f64) {
        self.add_count(value, 1);
    }

    /// Counts `n` occurrences of `value`.
    pub fn add_count(&mut self, value: f64, n: u64) {
        let bin = self.bin_index(value);
        self.counts[bin] += n;
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Total number of counted values.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `bin_count + 1` bin edges, starting at `min` and ending at `max`.
    pub fn edges(&self) -> Vec<f64> {
        let n = self.counts.len();
        let mut edges: Vec<f64> = (0..n)
            .map(|i| self.min + i as f64 * self.bin_width)
            .collect();
        edges.push(self.max);
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_bin_count() {
        assert_eq!(heuristic_bin_count(0), 1);
        assert_eq!(heuristic_bin_count(1), 1);
        assert_eq!(heuristic_bin_count(5), 5);
        assert_eq!(heuristic_bin_count(10), 10);
        // 30^3 / 10000 = 2.7 -> 3, raised to the lower bound 10
        assert_eq!(heuristic_bin_count(30), 10);
        // 50^3 / 10000 = 12.5 -> 13
        assert_eq!(heuristic_bin_count(50), 13);
        // 80^3 / 10000 = 51.2 -> 51
        assert_eq!(heuristic_bin_count(80), 51);
        assert_eq!(heuristic_bin_count(100), 100);
        assert_eq!(heuristic_bin_count(5000), 100);
    }

    #[test]
    fn test_bounds_land_in_first_and_last_bins() {
        let mut h = Histogram::new(0.0, 10.0, 5).unwrap();
        assert_eq!(h.bin_index(0.0), 0);
        assert_eq!(h.bin_index(10.0), 4);
        assert_eq!(h.bin_index(3.9), 1);
        assert_eq!(h.bin_index(-1.0), 0);
        assert_eq!(h.bin_index(99.0), 4);
        h.add(10.0);
        h.add(0.0);
        assert_eq!(h.counts(), &[1, 0, 0, 0, 1]);
    }

    #[test]
    fn test_degenerate_range() {
        let mut h = Histogram::new(3.0, 3.0, 4).unwrap();
        h.add(3.0);
        h.add(3.0);
        assert_eq!(h.counts()[0], 2);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn test_edges() {
        let h = Histogram::new(0.0, 1.0, 4).unwrap();
        assert_eq!(h.edges(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_invalid_construction_is_internal() {
        let err = Histogram::new(2.0, 1.0, 3).unwrap_err();
        assert!(!err.is_user_error());
        assert!(Histogram::new(0.0, 1.0, 0).is_err());
        assert!(Histogram::new(f64::INFINITY, f64::NEG_INFINITY, 1).is_err());
    }

    #[test]
    fn test_add_count() {
        let mut h = Histogram::new(0.0, 2.0, 3).unwrap();
        h.add_count(1.0, 7);
        assert_eq!(h.counts(), &[0, 7, 0]);
    }
}
