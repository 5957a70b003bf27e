//! # Run Session
//!
//! The state machine that ties everything together. A session owns:
//! - its position-source subscription (opened by `start`, closed by `finish`,
//!   `reset`, a source error, or drop)
//! - the accumulated metrics and sample log
//! - its lifecycle status
//!
//! All mutation happens through `&mut self`, so actions, fixes and errors are
//! applied one at a time in the order the host delivers them. Status is read
//! from the session itself at the moment of each update, never from a copy
//! taken when the subscription was opened.
//!
//! Actions are safe to call in any status. One that does not apply (pausing
//! while not recording, resuming while not paused, ...) is a no-op.

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RunError, SourceError};
use crate::filters::{assess_fix, FixAssessment};
use crate::metrics::MetricsAccumulator;
use crate::source::{
    Clock, PositionSource, SourceEvent, SourceEventKind, SourceOptions, Subscription,
    SubscriptionId, SystemClock,
};
use crate::splits::KmSplit;
use crate::state::{transition, SessionEvent};
use crate::summary::RunSummary;
use crate::{GeoPoint, RunConfig, RunMetrics, RunSample, RunStatus};

/// Everything an observer (UI, persistence) can see about a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub status: RunStatus,
    pub error: Option<SourceError>,
    pub config: RunConfig,
    pub metrics: RunMetrics,
    pub samples: Vec<RunSample>,
    pub splits: Vec<KmSplit>,
    /// Wall-clock start of the current run, epoch ms
    pub started_at_ms: Option<i64>,
}

/// A single run/walk tracking session.
pub struct RunSession<S: PositionSource, C: Clock = SystemClock> {
    source: S,
    clock: C,
    config: RunConfig,
    options: SourceOptions,

    status: RunStatus,
    error: Option<SourceError>,
    subscription: Option<S::Subscription>,
    subscriptions_opened: u64,

    started_at_ms: Option<i64>,
    paused_at_ms: Option<i64>,

    accumulator: MetricsAccumulator,
}

impl<S: PositionSource> RunSession<S, SystemClock> {
    /// Create an idle session using the system clock.
    pub fn new(source: S, config: RunConfig) -> Result<Self> {
        Self::with_clock(source, config, SystemClock)
    }
}

impl<S: PositionSource, C: Clock> RunSession<S, C> {
    /// Create an idle session with a custom clock.
    ///
    /// Fails if the configuration does not validate.
    pub fn with_clock(source: S, config: RunConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let accumulator = MetricsAccumulator::new(config.smoothing_window);
        Ok(Self {
            source,
            clock,
            config,
            options: SourceOptions::default(),
            status: RunStatus::Idle,
            error: None,
            subscription: None,
            subscriptions_opened: 0,
            started_at_ms: None,
            paused_at_ms: None,
            accumulator,
        })
    }

    /// Options used for every subscription this session opens.
    pub fn with_source_options(mut self, options: SourceOptions) -> Self {
        self.options = options;
        self
    }

    // ========================================================================
    // Lifecycle Actions
    // ========================================================================

    /// Begin a new run: clear all state, open a subscription, go to `acquiring`.
    ///
    /// Ignored while a run is live (acquiring, ready, recording, paused).
    /// From `finished` or `error` it starts a fresh run.
    pub fn start(&mut self) {
        if !self.apply(SessionEvent::Start) {
            return;
        }

        self.close_subscription();
        self.clear_run_state();
        self.started_at_ms = Some(self.clock.now_ms());

        self.subscriptions_opened += 1;
        let id = SubscriptionId(self.subscriptions_opened);
        match self.source.subscribe(&self.options, id) {
            Ok(subscription) => {
                info!("[RunSession] Subscribed to position source ({})", id);
                self.subscription = Some(subscription);
            }
            Err(err) => self.fail(err),
        }
    }

    /// Start recording from `ready` or `acquiring`.
    pub fn begin_recording(&mut self) {
        if self.apply(SessionEvent::BeginRecording) {
            self.paused_at_ms = None;
        }
    }

    /// Pause a recording run.
    pub fn pause(&mut self) {
        if self.apply(SessionEvent::Pause) {
            self.paused_at_ms = Some(self.clock.now_ms());
        }
    }

    /// Resume a paused run.
    pub fn resume(&mut self) {
        if self.apply(SessionEvent::Resume) {
            self.paused_at_ms = None;
        }
    }

    /// End the run and close the subscription. Metrics and samples are kept.
    pub fn finish(&mut self) {
        if self.apply(SessionEvent::Finish) {
            self.close_subscription();
            self.paused_at_ms = None;
        }
    }

    /// Discard everything and return to `idle`.
    pub fn reset(&mut self) {
        self.apply(SessionEvent::Reset);
        self.close_subscription();
        self.clear_run_state();
    }

    // ========================================================================
    // Source Events
    // ========================================================================

    /// Apply an event from the position source.
    ///
    /// Events for any subscription other than the open one are dropped.
    /// Returns whether the event was applied.
    pub fn handle_source_event(&mut self, event: SourceEvent) -> bool {
        if self.subscription_id() != Some(event.subscription) {
            debug!(
                "[RunSession] Dropping event for stale subscription {}",
                event.subscription
            );
            return false;
        }

        match event.kind {
            SourceEventKind::Fix(fix) => {
                self.process_fix(fix);
            }
            SourceEventKind::Error(err) => self.fail(err),
        }
        true
    }

    /// Feed a fix for the open subscription.
    ///
    /// Returns the filter outcome, or `None` if no subscription is open.
    pub fn on_fix(&mut self, fix: GeoPoint) -> Option<FixAssessment> {
        if self.subscription.is_none() {
            trace!("[RunSession] Fix ignored, no open subscription");
            return None;
        }
        Some(self.process_fix(fix))
    }

    /// Report a failure of the open subscription.
    pub fn on_source_error(&mut self, err: SourceError) {
        if self.subscription.is_some() {
            self.fail(err);
        }
    }

    fn process_fix(&mut self, fix: GeoPoint) -> FixAssessment {
        let assessment = assess_fix(self.accumulator.last_accepted(), &fix, &self.config);

        match assessment {
            FixAssessment::Rejected {
                reason,
                dist_m,
                delta_t_ms,
            } => {
                self.accumulator.record_rejection(&fix);
                debug!(
                    "[RunSession] Reject {}: accuracy={:?} dist={:.1}m dt={}ms",
                    reason, fix.accuracy, dist_m, delta_t_ms
                );
            }
            FixAssessment::Accepted { dist_m, delta_t_ms } => {
                let now = self.clock.now_ms();
                let elapsed_ms = now.saturating_sub(self.started_at_ms.unwrap_or(now));
                let moving = self.status != RunStatus::Paused;
                self.accumulator
                    .record_acceptance(fix, dist_m, delta_t_ms, elapsed_ms, moving);
                self.apply(SessionEvent::FixAccepted);
            }
        }

        assessment
    }

    fn fail(&mut self, err: SourceError) {
        if !self.apply(SessionEvent::SourceError) {
            return;
        }
        warn!("[RunSession] Position source failed: {}", err);
        self.close_subscription();
        self.paused_at_ms = None;
        self.error = Some(err);
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Run the central transition function and commit the new status.
    fn apply(&mut self, event: SessionEvent) -> bool {
        match transition(self.status, event) {
            Some(next) => {
                if next != self.status {
                    info!("[RunSession] {} -> {} ({:?})", self.status, next, event);
                }
                self.status = next;
                true
            }
            None => {
                trace!("[RunSession] {:?} ignored while {}", event, self.status);
                false
            }
        }
    }

    fn close_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            info!("[RunSession] Closed subscription {}", subscription.id());
        }
    }

    fn clear_run_state(&mut self) {
        self.error = None;
        self.started_at_ms = None;
        self.paused_at_ms = None;
        self.accumulator.clear();
    }

    // ========================================================================
    // Observable State
    // ========================================================================

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn error(&self) -> Option<&SourceError> {
        self.error.as_ref()
    }

    /// Accepted samples, oldest first.
    pub fn samples(&self) -> &[RunSample] {
        self.accumulator.samples()
    }

    pub fn metrics(&self) -> RunMetrics {
        self.accumulator.metrics()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn source_options(&self) -> &SourceOptions {
        &self.options
    }

    pub fn splits(&self) -> &[KmSplit] {
        self.accumulator.splits()
    }

    /// Id of the open subscription; source events must carry it.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.subscription.as_ref().map(|s| s.id())
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    /// When the current pause began, if paused.
    pub fn paused_since_ms(&self) -> Option<i64> {
        self.paused_at_ms
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            status: self.status,
            error: self.error.clone(),
            config: self.config.clone(),
            metrics: self.metrics(),
            samples: self.samples().to_vec(),
            splits: self.splits().to_vec(),
            started_at_ms: self.started_at_ms,
        }
    }

    /// Snapshot as JSON, for handing a finished run to storage.
    pub fn snapshot_json(&self) -> Result<String> {
        serde_json::to_string(&self.snapshot()).map_err(|e| RunError::Internal {
            message: format!("failed to serialize snapshot: {}", e),
        })
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_parts(self.samples(), &self.metrics(), self.splits())
    }
}

impl<S: PositionSource, C: Clock> Drop for RunSession<S, C> {
    fn drop(&mut self) {
        self.close_subscription();
    }
}

// ============================================================================
// Tests
// ============================================================================
