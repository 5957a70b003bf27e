//! Session lifecycle integration tests.
//!
//! Drives a full `RunSession` through realistic runs with a manual source and
//! clock: pausing, finishing, errors, restarts and a multi-kilometre run.
//!
//! Run with: `cargo test --test lifecycle_scenarios`

use approx::assert_relative_eq;
use run_tracker::{
    CoachLabel, GeoPoint, ManualClock, ManualSource, RejectReason, RunConfig, RunMetrics,
    RunSession, RunStatus, SignalGrade, SourceError, SourceEvent,
};

/// Meters covered by one `STEP_DEG` step of latitude along the equator.
const STEP_M: f64 = 3.3358;
const STEP_DEG: f64 = 0.00003;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_session() -> (RunSession<ManualSource, ManualClock>, ManualSource, ManualClock) {
    init_logging();
    let source = ManualSource::new();
    let clock = ManualClock::new(0);
    let session = RunSession::with_clock(source.clone(), RunConfig::default(), clock.clone())
        .expect("default config is valid");
    (session, source, clock)
}

/// Fix number `step` of a steady northbound jog, one per second.
fn jog_fix(step: i64) -> GeoPoint {
    GeoPoint::new(step as f64 * STEP_DEG, 0.0, step * 1000).with_accuracy(5.0)
}

/// Set the clock to the fix time and deliver it.
fn deliver(
    session: &mut RunSession<ManualSource, ManualClock>,
    clock: &ManualClock,
    fix: GeoPoint,
) {
    clock.set(fix.ts);
    session.on_fix(fix);
}

// ============================================================================
// Pause / Resume
// ============================================================================

#[test]
fn test_pause_excludes_interval_from_moving_time() {
    let (mut session, _, clock) = new_session();
    session.start();
    session.begin_recording();

    // Three fixes while recording: two moving intervals
    for step in 0..3 {
        deliver(&mut session, &clock, jog_fix(step));
    }
    session.pause();
    assert_eq!(session.status(), RunStatus::Paused);

    // Two fixes while paused: distance only
    for step in 3..5 {
        deliver(&mut session, &clock, jog_fix(step));
    }
    session.resume();
    assert_eq!(session.status(), RunStatus::Recording);
    assert_eq!(session.paused_since_ms(), None);

    // Three more while recording
    for step in 5..8 {
        deliver(&mut session, &clock, jog_fix(step));
    }

    let m = session.metrics();
    assert_eq!(m.gps_accepts, 8);
    assert_eq!(m.gps_rejects, 0);
    assert_eq!(m.moving_time_ms, 5000);
    assert_eq!(m.elapsed_ms, 7000);
    assert_relative_eq!(m.dist_total_m, 7.0 * STEP_M, epsilon = 0.01);
}

#[test]
fn test_resume_without_fixes_keeps_moving_time() {
    let (mut session, _, clock) = new_session();
    session.start();
    session.begin_recording();
    deliver(&mut session, &clock, jog_fix(0));
    deliver(&mut session, &clock, jog_fix(1));

    clock.set(1500);
    session.pause();
    clock.set(60_000);
    session.resume();

    assert_eq!(session.metrics().moving_time_ms, 1000);
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_distance_never_decreases() {
    let (mut session, _, clock) = new_session();
    session.start();
    session.begin_recording();

    let mut fixes: Vec<GeoPoint> = (0..40).map(jog_fix).collect();
    // Sprinkle in a bad-accuracy fix, a teleport and an over-sampled fix
    fixes.insert(10, GeoPoint::new(0.0, 0.0, 9_500).with_accuracy(80.0));
    fixes.insert(20, GeoPoint::new(0.01, 0.0, 18_900).with_accuracy(5.0));
    fixes.insert(30, GeoPoint::new(27.0 * STEP_DEG, 0.0, 27_100).with_accuracy(5.0));

    let mut last_total = 0.0;
    for fix in fixes {
        deliver(&mut session, &clock, fix);
        let total = session.metrics().dist_total_m;
        assert!(total >= last_total, "distance went from {} to {}", last_total, total);
        last_total = total;
    }

    let m = session.metrics();
    assert_eq!(m.gps_accepts, 40);
    assert_eq!(m.gps_rejects, 3);
    let samples = session.samples();
    assert!(samples.windows(2).all(|w| w[1].dist_total_m >= w[0].dist_total_m));
    assert_relative_eq!(samples[samples.len() - 1].dist_total_m, m.dist_total_m);
    assert!(samples.iter().all(|s| !s.rejected));
}

#[test]
fn test_rejections_report_their_gate() {
    let (mut session, _, clock) = new_session();
    session.start();
    deliver(&mut session, &clock, jog_fix(0));

    let reason = |fix: GeoPoint, session: &mut RunSession<ManualSource, ManualClock>| {
        clock.set(fix.ts);
        session.on_fix(fix).and_then(|a| a.reject_reason())
    };

    assert_eq!(
        reason(GeoPoint::new(0.0, 0.0, 1000).with_accuracy(30.0), &mut session),
        Some(RejectReason::Accuracy)
    );
    assert_eq!(
        reason(GeoPoint::new(0.0, 0.0, 500).with_accuracy(5.0), &mut session),
        Some(RejectReason::DeltaT)
    );
    assert_eq!(
        reason(GeoPoint::new(0.001, 0.0, 60_000).with_accuracy(5.0), &mut session),
        Some(RejectReason::Jump)
    );
    assert_eq!(
        reason(GeoPoint::new(0.0001, 0.0, 1000).with_accuracy(5.0), &mut session),
        Some(RejectReason::Speed)
    );
    assert_eq!(session.metrics().gps_rejects, 4);
    assert_eq!(session.metrics().gps_accepts, 1);
}

#[test]
fn test_extreme_timestamps_are_rejected_not_fatal() {
    let (mut session, _, clock) = new_session();
    session.start();
    session.begin_recording();

    // Anchored on a garbage timestamp, the next fix's interval overflows
    session.on_fix(GeoPoint::new(0.0, 0.0, i64::MIN).with_accuracy(5.0));
    clock.set(1000);
    let next = session.on_fix(GeoPoint::new(0.00002, 0.0, 1000).with_accuracy(5.0));
    assert_eq!(next.and_then(|a| a.reject_reason()), Some(RejectReason::DeltaT));

    let m = session.metrics();
    assert_eq!(m.gps_accepts, 1);
    assert_eq!(m.gps_rejects, 1);
    assert_eq!(m.moving_time_ms, 0);
    assert_eq!(m.dist_total_m, 0.0);
    assert_eq!(m.elapsed_ms, 0);
}

#[test]
fn test_extreme_fix_after_normal_anchor() {
    let (mut session, _, clock) = new_session();
    session.start();
    deliver(&mut session, &clock, jog_fix(0));
    deliver(&mut session, &clock, jog_fix(1));

    let wild = GeoPoint::new(STEP_DEG * 2.0, 0.0, i64::MIN).with_accuracy(5.0);
    assert_eq!(
        session.on_fix(wild).and_then(|a| a.reject_reason()),
        Some(RejectReason::DeltaT)
    );
    deliver(&mut session, &clock, jog_fix(2));
    assert_eq!(session.metrics().gps_accepts, 3);
    assert_eq!(session.metrics().moving_time_ms, 2000);
}

#[test]
fn test_actions_are_idempotent() {
    let (mut session, source, clock) = new_session();

    // Nothing to pause, resume or record yet
    session.pause();
    session.resume();
    session.begin_recording();
    assert_eq!(session.status(), RunStatus::Idle);

    session.start();
    session.start();
    assert_eq!(source.subscribe_count(), 1);

    deliver(&mut session, &clock, jog_fix(0));
    session.begin_recording();
    session.begin_recording();
    session.resume();
    assert_eq!(session.status(), RunStatus::Recording);

    session.pause();
    let paused = session.snapshot();
    session.pause();
    session.begin_recording();
    assert_eq!(session.snapshot(), paused);

    session.finish();
    let finished = session.snapshot();
    session.finish();
    session.pause();
    session.resume();
    assert_eq!(session.snapshot(), finished);
}

#[test]
fn test_reset_clears_everything() {
    let (mut session, source, clock) = new_session();
    clock.set(5_000);
    session.start();
    session.begin_recording();
    for step in 5..15 {
        deliver(&mut session, &clock, jog_fix(step));
    }
    session.pause();

    session.reset();
    assert_eq!(session.status(), RunStatus::Idle);
    assert_eq!(session.metrics(), RunMetrics::default());
    assert!(session.samples().is_empty());
    assert!(session.splits().is_empty());
    assert!(session.error().is_none());
    assert_eq!(session.started_at_ms(), None);
    assert_eq!(session.paused_since_ms(), None);
    assert_eq!(session.subscription_id(), None);
    assert_eq!(source.open_subscriptions(), 0);

    // Reset from idle is harmless
    session.reset();
    assert_eq!(session.status(), RunStatus::Idle);
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_equator_scenario() {
    let (mut session, _, clock) = new_session();
    session.start();
    assert_eq!(session.status(), RunStatus::Acquiring);

    deliver(&mut session, &clock, GeoPoint::new(0.0, 0.0, 0).with_accuracy(5.0));
    assert_eq!(session.status(), RunStatus::Ready);
    // ~11.1 m in 1 s is faster than 7 m/s
    deliver(&mut session, &clock, GeoPoint::new(0.0001, 0.0, 1000).with_accuracy(5.0));
    deliver(&mut session, &clock, GeoPoint::new(0.00002, 0.0, 2000).with_accuracy(5.0));

    let m = session.metrics();
    assert_eq!(m.gps_accepts, 2);
    assert_eq!(m.gps_rejects, 1);
    assert_relative_eq!(m.dist_total_m, 2.2239, epsilon = 0.001);
    assert_eq!(m.moving_time_ms, 2000);
    assert_eq!(m.elapsed_ms, 2000);
    // 2 s over 2.2239 m
    assert_relative_eq!(m.avg_pace_sec_per_km.unwrap(), 899.3, epsilon = 0.5);
    assert_relative_eq!(m.last_pace_sec_per_km.unwrap(), 899.3, epsilon = 0.5);
}

#[test]
fn test_source_error_then_restart() {
    let (mut session, source, clock) = new_session();
    session.start();
    session.begin_recording();
    deliver(&mut session, &clock, jog_fix(0));
    deliver(&mut session, &clock, jog_fix(1));

    session.on_source_error(SourceError::PermissionDenied);
    assert_eq!(session.status(), RunStatus::Error);
    assert_eq!(session.error(), Some(&SourceError::PermissionDenied));
    assert_eq!(source.open_subscriptions(), 0);
    // The partial run stays visible until the next start
    assert_eq!(session.metrics().gps_accepts, 2);

    // A second error has nothing to close
    session.on_source_error(SourceError::Timeout);
    assert_eq!(session.error(), Some(&SourceError::PermissionDenied));

    clock.set(10_000);
    session.start();
    assert_eq!(session.status(), RunStatus::Acquiring);
    assert!(session.error().is_none());
    assert_eq!(session.metrics(), RunMetrics::default());
    assert_eq!(session.started_at_ms(), Some(10_000));
    assert_eq!(source.open_subscriptions(), 1);
}

#[test]
fn test_late_events_after_restart_are_dropped() {
    let (mut session, _, clock) = new_session();
    session.start();
    let first = session.subscription_id().expect("subscription open");
    session.finish();

    session.start();
    let second = session.subscription_id().expect("subscription open");

    clock.set(1000);
    assert!(!session.handle_source_event(SourceEvent::fix(first, jog_fix(1))));
    assert!(!session.handle_source_event(SourceEvent::error(first, SourceError::Timeout)));
    assert_eq!(session.status(), RunStatus::Acquiring);
    assert_eq!(session.metrics().gps_accepts, 0);

    assert!(session.handle_source_event(SourceEvent::fix(second, jog_fix(1))));
    assert_eq!(session.status(), RunStatus::Ready);
}

#[test]
fn test_long_run_summary_and_splits() {
    let (mut session, _, clock) = new_session();
    session.start();
    session.begin_recording();
    for step in 0..700 {
        deliver(&mut session, &clock, jog_fix(step));
    }
    session.finish();

    let m = session.metrics();
    assert_eq!(m.gps_accepts, 700);
    assert_relative_eq!(m.dist_total_m, 699.0 * STEP_M, epsilon = 0.5);

    // ~3.34 m/s is just under 5:00 /km
    let splits = session.splits();
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[0].index, 1);
    assert_eq!(splits[1].index, 2);
    for split in splits {
        assert_relative_eq!(split.pace_sec_per_km, 299.78, epsilon = 0.05);
    }

    let summary = session.summary();
    assert_relative_eq!(summary.distance_km, m.dist_total_m / 1000.0);
    assert_eq!(summary.split_count, 2);
    assert_relative_eq!(summary.avg_pace_sec_per_km.unwrap(), 299.78, epsilon = 0.05);
    assert_relative_eq!(summary.pace_stability_sec.unwrap(), 0.0, epsilon = 0.01);
    assert_eq!(summary.acceptance_rate, Some(1.0));
    assert_eq!(summary.avg_accuracy_m, Some(5.0));
    assert_eq!(summary.signal_grade, SignalGrade::A);
    // Steady pace, clean signal, no pauses; two splits are too few to grade regularity
    assert_eq!(summary.coach.score, Some(75));
    assert_eq!(summary.coach.label, CoachLabel::VeryGood);
    assert_eq!(summary.coach.insights[0], "Very steady pace.");
    assert_eq!(run_tracker::format_pace(summary.avg_pace_sec_per_km), "4:59 /km");
    assert_eq!(run_tracker::format_duration(summary.moving_time_ms), "11:39");
}

#[test]
fn test_snapshot_round_trips_through_json() {
    let (mut session, _, clock) = new_session();
    session.start();
    session.begin_recording();
    for step in 0..5 {
        deliver(&mut session, &clock, jog_fix(step));
    }
    session.finish();

    let json = session.snapshot_json().expect("snapshot serializes");
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "finished");
    assert_eq!(value["config"]["maxAccuracyM"], 25.0);
    assert_eq!(value["samples"][1]["deltaTMs"], 1000);
    assert!(value["samples"][1].get("rejected").is_none());

    let restored: run_tracker::RunSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.status, RunStatus::Finished);
    assert_eq!(restored.samples.len(), 5);
    assert_eq!(restored.metrics.gps_accepts, 5);
    assert_eq!(restored.config, RunConfig::default());
}
