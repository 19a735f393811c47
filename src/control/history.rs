//! Bounded absorbance history with windowed statistics.

use std::collections::VecDeque;

use crate::math::{linear_slope, median, range};

/// Default capacity (samples).
pub const HISTORY_CAPACITY: usize = 100_000;

/// Points required before a slope is reported.
pub const MIN_SLOPE_POINTS: usize = 6;

/// `(time_s, absorbance)` samples, oldest first.
#[derive(Debug, Clone)]
pub struct AbsorbanceHistory {
    samples: VecDeque<(f64, f64)>,
    capacity: usize,
}

impl Default for AbsorbanceHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl AbsorbanceHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity.min(4096)), capacity }
    }

    /// Append a sample, dropping the oldest when full.
    pub fn push(&mut self, time_s: f64, absorbance: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((time_s, absorbance));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<(f64, f64)> {
        self.samples.back().copied()
    }

    fn since(&self, cutoff_s: f64) -> impl Iterator<Item = &(f64, f64)> {
        // Samples are time-ordered, so the window start is a binary search.
        let start = self.samples.partition_point(|(t, _)| *t < cutoff_s);
        self.samples.range(start..)
    }

    /// Median absorbance of samples at or after `cutoff_s`.
    pub fn median_since(&self, cutoff_s: f64) -> Option<f64> {
        median(self.since(cutoff_s).map(|&(_, a)| a))
    }

    /// Regression slope (AU/min) of samples at or after `cutoff_s`.
    pub fn slope_since(&self, cutoff_s: f64) -> Option<f64> {
        let pts: Vec<(f64, f64)> = self.since(cutoff_s).copied().collect();
        if pts.len() < MIN_SLOPE_POINTS {
            return None;
        }
        let t0 = pts[0].0;
        let xs: Vec<f64> = pts.iter().map(|(t, _)| (t - t0) / 60.0).collect();
        let ys: Vec<f64> = pts.iter().map(|(_, a)| *a).collect();
        linear_slope(&xs, &ys)
    }

    /// `max - min` of samples at or after `cutoff_s`.
    pub fn range_since(&self, cutoff_s: f64) -> Option<f64> {
        range(self.since(cutoff_s).map(|&(_, a)| a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear(n: usize, dt: f64, au_per_min: f64) -> AbsorbanceHistory {
        let mut h = AbsorbanceHistory::default();
        for i in 0..n {
            let t = i as f64 * dt;
            h.push(t, 0.1 + au_per_min * t / 60.0);
        }
        h
    }

    #[test]
    fn slope_is_reported_in_au_per_minute() {
        let h = linear(100, 1.0, 0.004);
        assert_relative_eq!(h.slope_since(70.0).unwrap(), 0.004, epsilon = 1e-12);
    }

    #[test]
    fn slope_needs_six_points() {
        let h = linear(10, 1.0, 0.004);
        assert!(h.slope_since(5.0).is_none()); // t = 5..=9
        assert!(h.slope_since(4.0).is_some());
    }

    #[test]
    fn windows_only_see_recent_samples() {
        let mut h = AbsorbanceHistory::default();
        h.push(0.0, 5.0);
        for i in 1..=4 {
            h.push(i as f64, 0.2);
        }
        assert_eq!(h.median_since(1.0), Some(0.2));
        assert_eq!(h.range_since(1.0), Some(0.0));
        assert_relative_eq!(h.range_since(0.0).unwrap(), 4.8, epsilon = 1e-12);
        assert_eq!(h.median_since(10.0), None);
    }

    #[test]
    fn capacity_drops_oldest() {
        let mut h = AbsorbanceHistory::with_capacity(3);
        for i in 0..5 {
            h.push(i as f64, i as f64);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.median_since(f64::NEG_INFINITY), Some(3.0));
        assert_eq!(h.latest(), Some((4.0, 4.0)));
    }
}
