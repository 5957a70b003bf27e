use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use log::info;
use run_tracker::{
    format_duration, format_pace, replay_fixes, GeoPoint, ManualClock, ManualSource, RunConfig,
    RunSession,
};

#[derive(Parser, Debug)]
#[command(name = "run-replay", about = "Replay recorded GPS fixes through the run tracker")]
struct Args {
    /// JSON file holding an array of fixes ({lat, lng, ts, accuracy?, speed?})
    fixes: PathBuf,

    /// JSON config file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print every fix with its accept/reject verdict instead of running a session
    #[arg(long, default_value_t = false)]
    diagnostic: bool,

    /// Print the final snapshot as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn load_fixes(path: &Path) -> anyhow::Result<Vec<GeoPoint>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing fixes in {}", path.display()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => {
            let raw =
                fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            Ok(RunConfig::from_json(&raw)?)
        }
        None => Ok(RunConfig::default()),
    }
}

fn print_diagnostic(fixes: &[GeoPoint], config: &RunConfig) -> anyhow::Result<()> {
    let report = replay_fixes(fixes, config);
    for (i, sample) in report.samples.iter().enumerate() {
        let verdict = match sample.reject_reason {
            Some(reason) => format!("reject:{}", reason),
            None => "accept".to_string(),
        };
        println!(
            "{:>5} ts={} acc={:?} d={:.1}m dt={}ms total={:.1}m pace={} {}",
            i,
            sample.point.ts,
            sample.point.accuracy,
            sample.dist_from_prev_m,
            sample.delta_t_ms,
            sample.dist_total_m,
            format_pace(sample.pace_sec_per_km),
            verdict
        );
    }
    println!(
        "accepted={} rejected={} distance={:.1}m",
        report.metrics.gps_accepts, report.metrics.gps_rejects, report.metrics.dist_total_m
    );
    Ok(())
}

fn run_session(fixes: &[GeoPoint], config: RunConfig, json: bool) -> anyhow::Result<()> {
    let start_ms = fixes.first().map(|f| f.ts).unwrap_or(0);
    let clock = ManualClock::new(start_ms);
    let mut session = RunSession::with_clock(ManualSource::new(), config, clock.clone())?;

    session.start();
    session.begin_recording();
    for fix in fixes {
        clock.set(fix.ts);
        session.on_fix(*fix);
    }
    session.finish();
    info!("Replayed {} fixes, final status {}", fixes.len(), session.status());

    if json {
        println!("{}", session.snapshot_json()?);
        return Ok(());
    }

    let summary = session.summary();
    println!("Distance:     {:.2} km", summary.distance_km);
    println!("Moving time:  {}", format_duration(summary.moving_time_ms));
    println!("Elapsed:      {}", format_duration(summary.elapsed_ms));
    println!("Avg pace:     {}", format_pace(summary.avg_pace_sec_per_km));
    println!("Best km:      {}", format_pace(summary.best_split_sec_per_km));
    println!("Worst km:     {}", format_pace(summary.worst_split_sec_per_km));
    println!("Splits:       {}", summary.split_count);
    if let Some(stability) = summary.pace_stability_sec {
        println!("Pace std dev: {:.1} s", stability);
    }
    println!(
        "GPS fixes:    {} accepted, {} rejected",
        summary.gps_accepts, summary.gps_rejects
    );
    match summary.avg_accuracy_m {
        Some(acc) => println!("GPS signal:   {} (avg {:.1} m)", summary.signal_grade, acc),
        None => println!("GPS signal:   {}", summary.signal_grade),
    }
    match summary.coach.score {
        Some(score) => println!("Coach score:  {} ({})", score, summary.coach.label),
        None => println!("Coach score:  {}", summary.coach.label),
    }
    for insight in &summary.coach.insights {
        println!("  - {}", insight);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let fixes = load_fixes(&args.fixes)?;
    let config = load_config(args.config.as_deref())?;

    if args.diagnostic {
        print_diagnostic(&fixes, &config)
    } else {
        run_session(&fixes, config, args.json)
    }
}
