//! # Run Tracker
//!
//! Live GPS tracking for runs and walks.
//!
//! This library turns a noisy stream of position fixes into trustworthy
//! distance, pace and duration metrics:
//! - Outlier rejection (accuracy, over-sampling, teleport jumps, impossible speed)
//! - Trailing moving-average pace smoothing
//! - Running totals with pause-aware moving time
//! - A strict session lifecycle (idle → acquiring → ready → recording → paused → finished)
//!
//! ## Features
//!
//! - **`cli`** - Build the `run-replay` binary for replaying recorded fix files
//!
//! ## Quick Start
//!
//! ```rust
//! use run_tracker::{GeoPoint, ManualClock, ManualSource, RunConfig, RunSession, RunStatus};
//!
//! let clock = ManualClock::new(0);
//! let mut session = RunSession::with_clock(ManualSource::new(), RunConfig::default(), clock.clone())
//!     .expect("default config is valid");
//!
//! session.start();
//! session.on_fix(GeoPoint::new(0.0, 0.0, 0).with_accuracy(5.0));
//! assert_eq!(session.status(), RunStatus::Ready);
//!
//! session.begin_recording();
//! clock.set(2000);
//! session.on_fix(GeoPoint::new(0.00002, 0.0, 2000).with_accuracy(5.0));
//!
//! let metrics = session.metrics();
//! assert_eq!(metrics.gps_accepts, 2);
//! assert!(metrics.dist_total_m > 2.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, RunError, SourceError};

// Geographic utilities (haversine distance)
pub mod geo_utils;

// Sample filter pipeline
pub mod filters;
pub use filters::{assess_fix, FixAssessment, RejectReason};

// Pace smoothing
pub mod smoothing;
pub use smoothing::PaceSmoother;

// Kilometre splits
pub mod splits;
pub use splits::{KmSplit, SplitTracker};

// Running totals and the sample log
pub mod metrics;
pub use metrics::MetricsAccumulator;

// Session lifecycle transitions
pub mod state;
pub use state::{transition, SessionEvent};

// Position source boundary and clocks
pub mod source;
pub use source::{
    Clock, ManualClock, ManualSource, ManualSubscription, PositionSource, SourceEvent,
    SourceEventKind, SourceOptions, Subscription, SubscriptionId, SystemClock,
};

// Run session state machine
pub mod session;
pub use session::{RunSession, RunSnapshot};

// Diagnostic replay of recorded fixes
pub mod replay;
pub use replay::{replay_fixes, ReplayReport};

// End-of-run summary
pub mod summary;
pub use summary::{format_duration, format_pace, RunSummary, SignalGrade};

// Coach score and insights
pub mod coach;
pub use coach::{CoachLabel, CoachScore};

// Mailbox actor for multi-threaded hosts
pub mod actor;
pub use actor::{spawn_session, spawn_session_with_clock, EventSink, SessionHandle};

/// Initialize logging for Android
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RunTrackerRust"),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A single raw position fix.
///
/// # Example
/// ```
/// use run_tracker::GeoPoint;
/// let fix = GeoPoint::new(51.5074, -0.1278, 1_700_000_000_000).with_accuracy(8.0);
/// assert_eq!(fix.accuracy, Some(8.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Fix timestamp, epoch milliseconds
    pub ts: i64,
    /// Horizontal accuracy radius in meters, if the device reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Device-reported ground speed in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl GeoPoint {
    /// Create a fix without accuracy or speed.
    pub fn new(lat: f64, lng: f64, ts: i64) -> Self {
        Self {
            lat,
            lng,
            ts,
            accuracy: None,
            speed: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Tunable filter and smoothing thresholds.
///
/// Supplied once when a session is created and immutable afterwards.
/// Partial JSON is merged onto the defaults:
///
/// ```
/// use run_tracker::RunConfig;
/// let cfg = RunConfig::from_json(r#"{"maxSpeedMps": 9.0}"#).unwrap();
/// assert_eq!(cfg.max_speed_mps, 9.0);
/// assert_eq!(cfg.max_accuracy_m, 25.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    /// Fixes with a worse accuracy radius are rejected.
    /// Default: 25.0 meters
    pub max_accuracy_m: f64,

    /// Minimum time between accepted fixes; throttles over-sampling devices.
    /// Default: 700 ms
    pub min_delta_t_ms: i64,

    /// Maximum plausible speed between accepted fixes.
    /// Default: 7.0 m/s (~25 km/h)
    pub max_speed_mps: f64,

    /// Maximum distance between consecutive accepted fixes (anti-teleport).
    /// Default: 60.0 meters
    pub max_jump_m: f64,

    /// Number of recent defined paces averaged for the displayed pace.
    /// Default: 5
    pub smoothing_window: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: 25.0,
            min_delta_t_ms: 700,
            max_speed_mps: 7.0,
            max_jump_m: 60.0,
            smoothing_window: 5,
        }
    }
}

impl RunConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check thresholds are usable.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(RunError::ConfigError {
                    message: format!("{} must be a positive number, got {}", name, value),
                })
            }
        };
        positive("maxAccuracyM", self.max_accuracy_m)?;
        positive("maxSpeedMps", self.max_speed_mps)?;
        positive("maxJumpM", self.max_jump_m)?;

        if self.min_delta_t_ms < 0 {
            return Err(RunError::ConfigError {
                message: format!("minDeltaTms must not be negative, got {}", self.min_delta_t_ms),
            });
        }

        std::num::NonZeroU32::new(self.smoothing_window)
            .ok_or_config("smoothingWindow must be at least 1")?;
        Ok(())
    }
}

/// A fix that went through the filter pipeline, with derived fields.
///
/// Samples in a session's log are always accepted. Diagnostic replay also
/// produces rejected entries, flagged with `rejected` and a `reject_reason`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSample {
    #[serde(flatten)]
    pub point: GeoPoint,
    /// Distance from the previous accepted fix (0 for the first)
    pub dist_from_prev_m: f64,
    /// Cumulative distance up to and including this sample
    pub dist_total_m: f64,
    /// Time since the previous accepted fix (0 for the first)
    pub delta_t_ms: i64,
    /// Smoothed pace in seconds per kilometer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace_sec_per_km: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub rejected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<RejectReason>,
}

/// Live summary derived from accepted samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetrics {
    /// Total accepted distance in meters
    pub dist_total_m: f64,
    /// Time between accepted fixes, excluding paused intervals
    pub moving_time_ms: i64,
    /// Wall-clock time since the session started
    pub elapsed_ms: i64,
    /// Moving time per kilometer, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_pace_sec_per_km: Option<f64>,
    /// Most recent defined smoothed pace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_pace_sec_per_km: Option<f64>,
    pub gps_rejects: u32,
    pub gps_accepts: u32,
    /// Accuracy of the last observed fix, accepted or not
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accuracy_m: Option<f64>,
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Acquiring,
    Ready,
    Recording,
    Paused,
    Finished,
    Error,
}

impl RunStatus {
    /// A subscription is open and fixes are being processed.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunStatus::Acquiring | RunStatus::Ready | RunStatus::Recording | RunStatus::Paused
        )
    }

    /// The session ended and only `reset()` or a fresh `start()` moves it on.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Finished | RunStatus::Error)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::Idle => "idle",
            RunStatus::Acquiring => "acquiring",
            RunStatus::Ready => "ready",
            RunStatus::Recording => "recording",
            RunStatus::Paused => "paused",
            RunStatus::Finished => "finished",
            RunStatus::Error => "error",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Tests
// ============================================================================
