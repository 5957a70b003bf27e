//! Coach score: a 0-100 rating of how well a run was executed.
//!
//! Four components, each skipped when there is too little data for it:
//! - pace stability, from the spread of sample paces (0-40)
//! - split regularity, from the spread of km split paces (0-25)
//! - GPS quality, from the fix reject rate (0-20)
//! - flow, the share of elapsed time spent moving (0-15)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::splits::KmSplit;
use crate::summary::{defined_paces, std_dev};
use crate::{RunMetrics, RunSample};

/// Fewer accepted samples than this and no score is given.
const MIN_SAMPLES: usize = 8;
const MAX_INSIGHTS: usize = 3;

const STABILITY_POINTS: f64 = 40.0;
const SPLIT_POINTS: f64 = 25.0;
const GPS_POINTS: f64 = 20.0;
const FLOW_POINTS: f64 = 15.0;

/// Pace spread (s/km) at which the stability component reaches zero.
const STABILITY_SPREAD_SEC: f64 = 60.0;
/// Split spread (s/km) at which the regularity component reaches zero.
const SPLIT_SPREAD_SEC: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachLabel {
    Elite,
    VeryGood,
    Good,
    NeedsWork,
    InsufficientData,
}

impl CoachLabel {
    pub fn for_score(score: u8) -> Self {
        match score {
            85.. => CoachLabel::Elite,
            70..=84 => CoachLabel::VeryGood,
            55..=69 => CoachLabel::Good,
            _ => CoachLabel::NeedsWork,
        }
    }
}

impl fmt::Display for CoachLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoachLabel::Elite => "Elite",
            CoachLabel::VeryGood => "Very good",
            CoachLabel::Good => "Good",
            CoachLabel::NeedsWork => "Needs work",
            CoachLabel::InsufficientData => "Not enough data",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachScore {
    /// 0-100, `None` until enough samples were recorded
    pub score: Option<u8>,
    pub label: CoachLabel,
    /// At most three short observations, most important first
    pub insights: Vec<String>,
}

impl CoachScore {
    pub fn from_parts(samples: &[RunSample], metrics: &RunMetrics, splits: &[KmSplit]) -> Self {
        let accepted = samples.iter().filter(|s| !s.rejected).count();
        if accepted < MIN_SAMPLES {
            return Self {
                score: None,
                label: CoachLabel::InsufficientData,
                insights: vec!["Start recording to generate insights.".to_string()],
            };
        }

        let pace_sd = std_dev(&defined_paces(samples));
        let split_paces: Vec<f64> = splits.iter().map(|s| s.pace_sec_per_km).collect();
        let split_sd = std_dev(&split_paces);

        let observed = metrics.gps_accepts + metrics.gps_rejects;
        let reject_rate = if observed > 0 {
            metrics.gps_rejects as f64 / observed as f64
        } else {
            0.0
        };
        let flow = if metrics.elapsed_ms > 0 {
            metrics.moving_time_ms as f64 / metrics.elapsed_ms as f64
        } else {
            1.0
        };

        let components = [
            pace_sd.map(|sd| spread_points(sd, STABILITY_SPREAD_SEC, STABILITY_POINTS)),
            split_sd.map(|sd| spread_points(sd, SPLIT_SPREAD_SEC, SPLIT_POINTS)),
            Some(ratio_points(1.0 - reject_rate, GPS_POINTS)),
            Some(ratio_points(flow, FLOW_POINTS)),
        ];
        let score = components.iter().flatten().sum::<u32>().min(100) as u8;

        let mut insights = vec![match pace_sd {
            Some(sd) if sd < 18.0 => "Very steady pace.",
            Some(sd) if sd < 35.0 => "Good pace consistency.",
            Some(_) => "Pace is drifting, aim for an even effort.",
            None => "More data needed to judge pace.",
        }];
        if let Some(sd) = split_sd {
            insights.push(if sd < 35.0 {
                "Even splits, well judged."
            } else {
                "Uneven splits, control the opening kilometres."
            });
        }
        if observed > 0 {
            insights.push(if reject_rate < 0.08 {
                "GPS signal was stable."
            } else {
                "GPS signal wavered, avoid covered or shaded areas."
            });
        }
        if metrics.elapsed_ms > 0 {
            insights.push(if flow > 0.92 {
                "Few pauses, good flow."
            } else {
                "Many pauses, try longer continuous blocks."
            });
        }
        insights.truncate(MAX_INSIGHTS);

        Self {
            score: Some(score),
            label: CoachLabel::for_score(score),
            insights: insights.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Full points at zero spread, falling linearly to none at `zero_at`.
fn spread_points(sd: f64, zero_at: f64, points: f64) -> u32 {
    ratio_points(1.0 - sd / zero_at, points)
}

fn ratio_points(ratio: f64, points: f64) -> u32 {
    (ratio.clamp(0.0, 1.0) * points).round() as u32
}
