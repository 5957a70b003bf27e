//! # Metrics Accumulator
//!
//! Running totals for one session: distance, elapsed and moving time,
//! accept/reject counters, the accepted sample log, pace history and splits.
//!
//! The accumulator does not know about session status. The caller says
//! whether an accepted interval counts as moving time, reading its own status
//! at the moment of the update.

use crate::smoothing::PaceSmoother;
use crate::splits::{KmSplit, SplitTracker};
use crate::{GeoPoint, RunMetrics, RunSample};

#[derive(Debug, Clone)]
pub struct MetricsAccumulator {
    dist_total_m: f64,
    moving_time_ms: i64,
    elapsed_ms: i64,
    gps_accepts: u32,
    gps_rejects: u32,
    last_accuracy_m: Option<f64>,
    last_pace_sec_per_km: Option<f64>,

    last_accepted: Option<GeoPoint>,
    samples: Vec<RunSample>,
    smoother: PaceSmoother,
    splits: SplitTracker,
}

impl MetricsAccumulator {
    pub fn new(smoothing_window: u32) -> Self {
        Self {
            dist_total_m: 0.0,
            moving_time_ms: 0,
            elapsed_ms: 0,
            gps_accepts: 0,
            gps_rejects: 0,
            last_accuracy_m: None,
            last_pace_sec_per_km: None,
            last_accepted: None,
            samples: Vec::new(),
            smoother: PaceSmoother::new(smoothing_window),
            splits: SplitTracker::new(),
        }
    }

    /// Previous accepted fix, the anchor for every filter gate.
    pub fn last_accepted(&self) -> Option<&GeoPoint> {
        self.last_accepted.as_ref()
    }

    /// Count a rejected fix. Only the counter and last accuracy change.
    pub fn record_rejection(&mut self, fix: &GeoPoint) {
        self.gps_rejects += 1;
        self.last_accuracy_m = fix.accuracy;
    }

    /// Fold an accepted fix into the totals and append it to the sample log.
    ///
    /// `elapsed_ms` is the wall-clock time since the session started.
    /// `moving` is false while the session is paused; the interval then adds
    /// distance but no moving time.
    pub fn record_acceptance(
        &mut self,
        fix: GeoPoint,
        dist_from_prev_m: f64,
        delta_t_ms: i64,
        elapsed_ms: i64,
        moving: bool,
    ) -> &RunSample {
        let has_prev = self.last_accepted.is_some();
        let dist_from_prev_m = if has_prev { dist_from_prev_m.max(0.0) } else { 0.0 };
        let delta_t_ms = if has_prev { delta_t_ms } else { 0 };

        self.dist_total_m += dist_from_prev_m;
        self.elapsed_ms = elapsed_ms;
        let moving_delta = if has_prev && moving { delta_t_ms } else { 0 };
        self.moving_time_ms = self.moving_time_ms.saturating_add(moving_delta);
        self.gps_accepts += 1;
        self.last_accuracy_m = fix.accuracy;

        let raw_pace = PaceSmoother::instant_pace(dist_from_prev_m, delta_t_ms);
        let pace = self.smoother.push(raw_pace);
        if pace.is_some() {
            self.last_pace_sec_per_km = pace;
        }

        if has_prev {
            self.splits.push(dist_from_prev_m, moving_delta);
        }

        self.last_accepted = Some(fix);
        self.samples.push(RunSample {
            point: fix,
            dist_from_prev_m,
            dist_total_m: self.dist_total_m,
            delta_t_ms,
            pace_sec_per_km: pace,
            rejected: false,
            reject_reason: None,
        });
        &self.samples[self.samples.len() - 1]
    }

    /// Current metrics, with average pace derived from moving time.
    pub fn metrics(&self) -> RunMetrics {
        let avg_pace_sec_per_km = if self.dist_total_m > 0.0 {
            Some((self.moving_time_ms as f64 / 1000.0) / (self.dist_total_m / 1000.0))
        } else {
            None
        };

        RunMetrics {
            dist_total_m: self.dist_total_m,
            moving_time_ms: self.moving_time_ms,
            elapsed_ms: self.elapsed_ms,
            avg_pace_sec_per_km,
            last_pace_sec_per_km: self.last_pace_sec_per_km,
            gps_rejects: self.gps_rejects,
            gps_accepts: self.gps_accepts,
            last_accuracy_m: self.last_accuracy_m,
        }
    }

    pub fn samples(&self) -> &[RunSample] {
        &self.samples
    }

    pub fn splits(&self) -> &[KmSplit] {
        self.splits.splits()
    }

    pub fn dist_total_m(&self) -> f64 {
        self.dist_total_m
    }

    /// Drop all state, keeping the smoothing window.
    pub fn clear(&mut self) {
        self.dist_total_m = 0.0;
        self.moving_time_ms = 0;
        self.elapsed_ms = 0;
        self.gps_accepts = 0;
        self.gps_rejects = 0;
        self.last_accuracy_m = None;
        self.last_pace_sec_per_km = None;
        self.last_accepted = None;
        self.samples.clear();
        self.smoother.clear();
        self.splits.clear();
    }
}
