//! # Position Source Boundary
//!
//! The platform location service is an external collaborator. A session asks
//! it for a subscription and the host delivers the resulting fixes and errors
//! back to the session as [`SourceEvent`]s.
//!
//! Every event carries the [`SubscriptionId`] it was issued for. A session
//! drops events whose id does not match its open subscription, so nothing a
//! source emits after cancellation (or for an older session run) can reach
//! the metrics.
//!
//! This module also provides the clocks used for elapsed time, and a manual
//! source for replay and tests.

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::GeoPoint;

// ============================================================================
// Subscription
// ============================================================================

/// Identifies one subscription opened by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Options passed to the position source when subscribing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceOptions {
    /// Ask for the most precise positioning the device offers.
    /// Default: true
    pub high_accuracy: bool,
    /// Report a timeout if no fix arrives within this window.
    /// Default: 12000 ms
    pub timeout_ms: u64,
    /// Maximum age of a cached fix the source may hand out.
    /// Default: 0 (always fresh)
    pub max_fix_age_ms: u64,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 12_000,
            max_fix_age_ms: 0,
        }
    }
}

/// A cancellable, long-lived subscription.
///
/// `cancel` must be idempotent and must stop delivery before it returns.
pub trait Subscription {
    fn id(&self) -> SubscriptionId;
    fn cancel(&mut self);
}

/// Capability that opens fix subscriptions.
pub trait PositionSource {
    type Subscription: Subscription;

    /// Open a subscription whose events will be tagged with `id`.
    ///
    /// Returns [`SourceError::NoSource`] when location is unavailable on this
    /// device, in which case nothing is opened.
    fn subscribe(
        &mut self,
        options: &SourceOptions,
        id: SubscriptionId,
    ) -> Result<Self::Subscription, SourceError>;
}

/// What a source delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEventKind {
    Fix(GeoPoint),
    Error(SourceError),
}

/// A fix or error, tagged with the subscription it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub subscription: SubscriptionId,
    pub kind: SourceEventKind,
}

impl SourceEvent {
    pub fn fix(subscription: SubscriptionId, fix: GeoPoint) -> Self {
        Self {
            subscription,
            kind: SourceEventKind::Fix(fix),
        }
    }

    pub fn error(subscription: SubscriptionId, error: SourceError) -> Self {
        Self {
            subscription,
            kind: SourceEventKind::Error(error),
        }
    }
}

// ============================================================================
// Clocks
// ============================================================================

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// Real time via chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Manual Source
// ============================================================================

#[derive(Debug, Default)]
struct ManualSourceState {
    subscribes: AtomicU64,
    open: AtomicUsize,
    last_options: Mutex<Option<SourceOptions>>,
}

/// A position source driven by hand.
///
/// Subscribing always succeeds (unless built with [`ManualSource::failing`])
/// and nothing is emitted on its own; the host feeds fixes to the session.
/// Clones share counters, so a test can keep one and hand the other to a
/// session.
#[derive(Debug, Clone, Default)]
pub struct ManualSource {
    state: Arc<ManualSourceState>,
    fail_with: Option<SourceError>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device without any location capability.
    pub fn unavailable() -> Self {
        Self::failing(SourceError::NoSource)
    }

    /// A source whose every subscribe attempt fails with `error`.
    pub fn failing(error: SourceError) -> Self {
        Self {
            state: Arc::default(),
            fail_with: Some(error),
        }
    }

    /// Number of successful subscribe calls.
    pub fn subscribe_count(&self) -> u64 {
        self.state.subscribes.load(Ordering::SeqCst)
    }

    /// Subscriptions opened and not yet cancelled.
    pub fn open_subscriptions(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<SourceOptions> {
        self.state
            .last_options
            .lock()
            .map(|opts| opts.clone())
            .unwrap_or(None)
    }
}

impl PositionSource for ManualSource {
    type Subscription = ManualSubscription;

    fn subscribe(
        &mut self,
        options: &SourceOptions,
        id: SubscriptionId,
    ) -> Result<ManualSubscription, SourceError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }

        self.state.subscribes.fetch_add(1, Ordering::SeqCst);
        self.state.open.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.state.last_options.lock() {
            *last = Some(options.clone());
        }

        Ok(ManualSubscription {
            id,
            state: Arc::clone(&self.state),
            cancelled: false,
        })
    }
}

/// Subscription handed out by [`ManualSource`].
#[derive(Debug)]
pub struct ManualSubscription {
    id: SubscriptionId,
    state: Arc<ManualSourceState>,
    cancelled: bool,
}

impl Subscription for ManualSubscription {
    fn id(&self) -> SubscriptionId {
        self.id
    }

    fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.state.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ManualSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
