//! Diagnostic replay of recorded fixes.
//!
//! Runs a fix list through the same filter pipeline and accumulator a live
//! session uses, but keeps every fix in the output so rejections can be
//! inspected. Fix timestamps stand in for the wall clock and every interval
//! counts as moving.

use serde::{Deserialize, Serialize};

use crate::filters::{assess_fix, FixAssessment};
use crate::metrics::MetricsAccumulator;
use crate::splits::KmSplit;
use crate::{GeoPoint, RunConfig, RunMetrics, RunSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    /// One entry per input fix, in input order
    pub samples: Vec<RunSample>,
    pub metrics: RunMetrics,
    pub splits: Vec<KmSplit>,
}

impl ReplayReport {
    pub fn accepted(&self) -> impl Iterator<Item = &RunSample> {
        self.samples.iter().filter(|s| !s.rejected)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &RunSample> {
        self.samples.iter().filter(|s| s.rejected)
    }
}

/// Replay `fixes` against `config`.
///
/// Rejected entries carry the distance and delta measured against the
/// previous accepted fix, and the running total as it stood.
pub fn replay_fixes(fixes: &[GeoPoint], config: &RunConfig) -> ReplayReport {
    let mut accumulator = MetricsAccumulator::new(config.smoothing_window);
    let mut samples = Vec::with_capacity(fixes.len());
    let started_at = fixes.first().map(|f| f.ts).unwrap_or(0);

    for fix in fixes {
        match assess_fix(accumulator.last_accepted(), fix, config) {
            FixAssessment::Accepted { dist_m, delta_t_ms } => {
                let sample = accumulator.record_acceptance(
                    *fix,
                    dist_m,
                    delta_t_ms,
                    fix.ts.saturating_sub(started_at),
                    true,
                );
                samples.push(sample.clone());
            }
            FixAssessment::Rejected {
                reason,
                dist_m,
                delta_t_ms,
            } => {
                accumulator.record_rejection(fix);
                samples.push(RunSample {
                    point: *fix,
                    dist_from_prev_m: dist_m,
                    dist_total_m: accumulator.dist_total_m(),
                    delta_t_ms,
                    pace_sec_per_km: None,
                    rejected: true,
                    reject_reason: Some(reason),
                });
            }
        }
    }

    ReplayReport {
        samples,
        metrics: accumulator.metrics(),
        splits: accumulator.splits().to_vec(),
    }
}
