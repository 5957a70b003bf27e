//! Sample filter pipeline.
//!
//! Four independent gates decide whether a raw fix becomes an accepted sample.
//! They run in a fixed order and short-circuit on the first failure:
//!
//! 1. **Accuracy** - reported accuracy radius within `max_accuracy_m`
//! 2. **Delta T** - at least `min_delta_t_ms` since the previous accepted fix
//! 3. **Jump** - no more than `max_jump_m` from the previous accepted fix
//! 4. **Speed** - implied speed no more than `max_speed_mps`
//!
//! Every gate is measured against the previous *accepted* fix, never against
//! the previous raw one, so a burst of rejected noise does not move the anchor.

use serde::{Deserialize, Serialize};

use crate::geo_utils::haversine_distance;
use crate::{GeoPoint, RunConfig};

/// Which gate rejected a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Accuracy,
    DeltaT,
    Jump,
    Speed,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RejectReason::Accuracy => "accuracy",
            RejectReason::DeltaT => "delta_t",
            RejectReason::Jump => "jump",
            RejectReason::Speed => "speed",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of running one fix through the pipeline.
///
/// Distance and delta are measured against the previous accepted fix and are
/// zero when there is none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixAssessment {
    Accepted { dist_m: f64, delta_t_ms: i64 },
    Rejected {
        reason: RejectReason,
        dist_m: f64,
        delta_t_ms: i64,
    },
}

impl FixAssessment {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixAssessment::Accepted { .. })
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            FixAssessment::Accepted { .. } => None,
            FixAssessment::Rejected { reason, .. } => Some(*reason),
        }
    }
}

/// Accuracy gate. A fix without a reported accuracy passes.
pub fn is_accuracy_ok(fix: &GeoPoint, cfg: &RunConfig) -> bool {
    match fix.accuracy {
        None => true,
        Some(accuracy) => accuracy <= cfg.max_accuracy_m,
    }
}

/// Minimum time-delta gate. Always passes for the first fix.
///
/// An interval that does not fit in an `i64` fails.
pub fn is_delta_t_ok(prev: Option<&GeoPoint>, next: &GeoPoint, cfg: &RunConfig) -> bool {
    match prev {
        None => true,
        Some(prev) => next
            .ts
            .checked_sub(prev.ts)
            .is_some_and(|delta| delta >= cfg.min_delta_t_ms),
    }
}

/// Maximum jump gate. A NaN distance fails.
pub fn is_jump_ok(dist_m: f64, cfg: &RunConfig) -> bool {
    dist_m <= cfg.max_jump_m
}

/// Maximum speed gate. Fails closed on a zero or negative interval.
pub fn is_speed_ok(dist_m: f64, delta_t_ms: i64, cfg: &RunConfig) -> bool {
    if delta_t_ms <= 0 {
        return false;
    }
    let speed = dist_m / (delta_t_ms as f64 / 1000.0);
    speed <= cfg.max_speed_mps
}

/// Run a candidate fix through every gate.
///
/// Pure: the outcome depends only on `prev`, `next` and `cfg`.
///
/// # Example
/// ```
/// use run_tracker::{assess_fix, GeoPoint, RejectReason, RunConfig};
///
/// let cfg = RunConfig::default();
/// let a = GeoPoint::new(0.0, 0.0, 0).with_accuracy(5.0);
/// // ~11 m in one second is ~11 m/s, faster than the 7 m/s default
/// let b = GeoPoint::new(0.0001, 0.0, 1000).with_accuracy(5.0);
///
/// assert!(assess_fix(None, &a, &cfg).is_accepted());
/// assert_eq!(assess_fix(Some(&a), &b, &cfg).reject_reason(), Some(RejectReason::Speed));
/// ```
pub fn assess_fix(prev: Option<&GeoPoint>, next: &GeoPoint, cfg: &RunConfig) -> FixAssessment {
    // Saturated deltas only ever reach a rejection: the delta-t gate checks the exact value
    let delta_t_ms = prev.map(|p| next.ts.saturating_sub(p.ts)).unwrap_or(0);
    let dist_m = prev.map(|p| haversine_distance(p, next)).unwrap_or(0.0);

    let reject = |reason| FixAssessment::Rejected {
        reason,
        dist_m,
        delta_t_ms,
    };

    if !is_accuracy_ok(next, cfg) {
        return reject(RejectReason::Accuracy);
    }
    if !is_delta_t_ok(prev, next, cfg) {
        return reject(RejectReason::DeltaT);
    }
    if prev.is_some() {
        if !is_jump_ok(dist_m, cfg) {
            return reject(RejectReason::Jump);
        }
        if !is_speed_ok(dist_m, delta_t_ms, cfg) {
            return reject(RejectReason::Speed);
        }
    }

    FixAssessment::Accepted { dist_m, delta_t_ms }
}
