//! End-of-run summary and display formatting.
//!
//! Built from the same samples, metrics and splits a session exposes, so it
//! can be computed live or once at `finish()`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coach::CoachScore;
use crate::splits::KmSplit;
use crate::{RunMetrics, RunSample};

/// Minimum number of values before a spread is reported.
const MIN_VALUES_FOR_SPREAD: usize = 6;

/// Average accuracy (m) still graded A.
const GRADE_A_MAX_ACCURACY_M: f64 = 15.0;
/// Average accuracy (m) still graded B.
const GRADE_B_MAX_ACCURACY_M: f64 = 30.0;

/// Overall GPS signal quality, from the average accuracy of accepted fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalGrade {
    A,
    B,
    C,
}

impl SignalGrade {
    /// `C` when no fix reported an accuracy.
    pub fn from_avg_accuracy(avg_accuracy_m: Option<f64>) -> Self {
        match avg_accuracy_m {
            Some(acc) if acc <= GRADE_A_MAX_ACCURACY_M => SignalGrade::A,
            Some(acc) if acc <= GRADE_B_MAX_ACCURACY_M => SignalGrade::B,
            _ => SignalGrade::C,
        }
    }
}

impl fmt::Display for SignalGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalGrade::A => "A",
            SignalGrade::B => "B",
            SignalGrade::C => "C",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub distance_km: f64,
    pub moving_time_ms: i64,
    pub elapsed_ms: i64,
    pub avg_pace_sec_per_km: Option<f64>,
    /// Fastest completed kilometre
    pub best_split_sec_per_km: Option<f64>,
    /// Slowest completed kilometre
    pub worst_split_sec_per_km: Option<f64>,
    pub split_count: u32,
    /// Standard deviation of sample paces; lower is steadier
    pub pace_stability_sec: Option<f64>,
    pub gps_accepts: u32,
    pub gps_rejects: u32,
    /// Accepted share of all observed fixes, 0.0-1.0
    pub acceptance_rate: Option<f64>,
    /// Mean reported accuracy of accepted fixes
    pub avg_accuracy_m: Option<f64>,
    pub signal_grade: SignalGrade,
    pub coach: CoachScore,
}

impl RunSummary {
    pub fn from_parts(samples: &[RunSample], metrics: &RunMetrics, splits: &[KmSplit]) -> Self {
        let paces = defined_paces(samples);

        let split_paces = splits.iter().map(|s| s.pace_sec_per_km);
        let best = split_paces.clone().fold(None, |best: Option<f64>, p| {
            Some(best.map_or(p, |b| b.min(p)))
        });
        let worst = split_paces.fold(None, |worst: Option<f64>, p| {
            Some(worst.map_or(p, |w| w.max(p)))
        });

        let observed = metrics.gps_accepts + metrics.gps_rejects;
        let acceptance_rate = if observed > 0 {
            Some(metrics.gps_accepts as f64 / observed as f64)
        } else {
            None
        };

        let accuracies: Vec<f64> = samples
            .iter()
            .filter(|s| !s.rejected)
            .filter_map(|s| s.point.accuracy)
            .filter(|a| a.is_finite())
            .collect();
        let avg_accuracy_m = if accuracies.is_empty() {
            None
        } else {
            Some(accuracies.iter().sum::<f64>() / accuracies.len() as f64)
        };

        Self {
            distance_km: metrics.dist_total_m / 1000.0,
            moving_time_ms: metrics.moving_time_ms,
            elapsed_ms: metrics.elapsed_ms,
            avg_pace_sec_per_km: metrics.avg_pace_sec_per_km,
            best_split_sec_per_km: best,
            worst_split_sec_per_km: worst,
            split_count: splits.len() as u32,
            pace_stability_sec: std_dev(&paces),
            gps_accepts: metrics.gps_accepts,
            gps_rejects: metrics.gps_rejects,
            acceptance_rate,
            avg_accuracy_m,
            signal_grade: SignalGrade::from_avg_accuracy(avg_accuracy_m),
            coach: CoachScore::from_parts(samples, metrics, splits),
        }
    }
}

/// Finite, positive paces of accepted samples.
pub(crate) fn defined_paces(samples: &[RunSample]) -> Vec<f64> {
    samples
        .iter()
        .filter(|s| !s.rejected)
        .filter_map(|s| s.pace_sec_per_km)
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect()
}

/// Population standard deviation, `None` with fewer than six values.
pub(crate) fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < MIN_VALUES_FOR_SPREAD {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Format a pace as `m:ss /km`, or `—` when undefined.
pub fn format_pace(sec_per_km: Option<f64>) -> String {
    match sec_per_km {
        Some(pace) if pace.is_finite() && pace > 0.0 => {
            let total = pace.floor() as u64;
            format!("{}:{:02} /km", total / 60, total % 60)
        }
        _ => "—".to_string(),
    }
}

/// Format a duration as `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_duration(ms: i64) -> String {
    let total = (ms.max(0) / 1000) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
