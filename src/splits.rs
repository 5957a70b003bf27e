//! Kilometre splits.
//!
//! Accepted distance and moving time are poured into a bucket. Whenever the
//! bucket holds a full kilometre a split is emitted, its time scaled to exactly
//! 1000 m, and the leftover distance keeps a proportional share of the time.

use serde::{Deserialize, Serialize};

const SPLIT_DISTANCE_M: f64 = 1000.0;

/// One completed kilometre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmSplit {
    /// 1-based kilometre number
    pub index: u32,
    /// Moving time spent on this kilometre
    pub duration_ms: i64,
    /// Same as `duration_ms`, in seconds per kilometre
    pub pace_sec_per_km: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SplitTracker {
    bucket_dist_m: f64,
    bucket_time_ms: f64,
    splits: Vec<KmSplit>,
}

impl SplitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one accepted interval. `moving_ms` is zero for paused intervals.
    ///
    /// Returns the splits completed by this interval (usually none).
    pub fn push(&mut self, dist_m: f64, moving_ms: i64) -> &[KmSplit] {
        let before = self.splits.len();
        if !(dist_m.is_finite() && dist_m > 0.0) {
            return &self.splits[before..];
        }

        self.bucket_dist_m += dist_m;
        self.bucket_time_ms += moving_ms.max(0) as f64;

        while self.bucket_dist_m >= SPLIT_DISTANCE_M {
            let split_ms = self.bucket_time_ms * (SPLIT_DISTANCE_M / self.bucket_dist_m);
            self.splits.push(KmSplit {
                index: self.splits.len() as u32 + 1,
                duration_ms: split_ms.round() as i64,
                pace_sec_per_km: split_ms / 1000.0,
            });

            self.bucket_time_ms -= split_ms;
            self.bucket_dist_m -= SPLIT_DISTANCE_M;
        }

        &self.splits[before..]
    }

    pub fn splits(&self) -> &[KmSplit] {
        &self.splits
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_split_below_one_km() {
        let mut tracker = SplitTracker::new();
        for _ in 0..99 {
            assert!(tracker.push(10.0, 3000).is_empty());
        }
        assert!(tracker.splits().is_empty());
        assert_eq!(tracker.push(10.0, 3000).len(), 1);
    }

    #[test]
    fn test_even_pace_split() {
        let mut tracker = SplitTracker::new();
        // 10 m every 3 s is a 5:00 /km pace
        for _ in 0..100 {
            tracker.push(10.0, 3000);
        }
        let splits = tracker.splits();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].index, 1);
        assert_relative_eq!(splits[0].pace_sec_per_km, 300.0, epsilon = 1e-6);
        assert_eq!(splits[0].duration_ms, 300_000);
    }

    #[test]
    fn test_overshoot_keeps_remainder() {
        let mut tracker = SplitTracker::new();
        tracker.push(990.0, 297_000);
        // Crossing interval: 20 m in 6 s at the same pace
        let completed = tracker.push(20.0, 6000).to_vec();
        assert_eq!(completed.len(), 1);
        assert_relative_eq!(completed[0].pace_sec_per_km, 300.0, epsilon = 1e-6);

        // The leftover 10 m and 3 s carry into the second kilometre
        let completed = tracker.push(990.0, 297_000).to_vec();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].index, 2);
        assert_relative_eq!(completed[0].pace_sec_per_km, 300.0, epsilon = 1e-6);
    }

    #[test]
    fn test_paused_distance_adds_no_time() {
        let mut tracker = SplitTracker::new();
        tracker.push(500.0, 150_000);
        tracker.push(500.0, 0);
        assert_relative_eq!(tracker.splits()[0].pace_sec_per_km, 150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ignores_degenerate_intervals() {
        let mut tracker = SplitTracker::new();
        tracker.push(f64::NAN, 1000);
        tracker.push(0.0, 1000);
        tracker.push(-5.0, 1000);
        assert!(tracker.splits().is_empty());

        // None of their time leaks into the next split
        tracker.push(1000.0, 300_000);
        assert_relative_eq!(tracker.splits()[0].pace_sec_per_km, 300.0, epsilon = 1e-6);
    }
}
