//! Aggregation commands: telemetry rollup, ops baseline, submission queue health.

use crate::analysis::{baseline, queue_health, telemetry};
use crate::commands::settings::load_effective_settings;
use crate::commands::store;
use crate::error::Result;
use crate::models::baseline::{OpsBaseline, OpsHistory};
use crate::models::queue::{QueueHealthSnapshot, SubmissionsFile};
use crate::models::telemetry::TelemetryRollup;
use chrono::{DateTime, Utc};
use std::path::Path;

pub fn run_telemetry_rollup(data_dir: &Path) -> Result<TelemetryRollup> {
    let settings = load_effective_settings(data_dir)?;
    let lines = store::read_lines(&data_dir.join(store::TELEMETRY_EVENTS))?;
    let (events, skipped) = telemetry::parse_events(&lines);
    if skipped > 0 {
        log::warn!("skipped {skipped} malformed telemetry lines");
    }

    let guardrails = settings.telemetry.enabled.then_some(&settings.telemetry);
    let mut rolled = telemetry::rollup(&events, guardrails);
    rolled.skipped_lines = skipped;

    if let Some(report) = &rolled.guardrails {
        if report.events_capped > 0 {
            log::warn!("guardrails dropped {} events over the per-day cap", report.events_capped);
        }
        for spike in &report.spike_days {
            log::warn!("spike on {}: {} events", spike.day, spike.events);
        }
    }

    store::write_json_pretty(&data_dir.join(store::TELEMETRY_OUT), &rolled)?;
    Ok(rolled)
}

pub fn run_ops_baseline(data_dir: &Path, now: DateTime<Utc>) -> Result<OpsBaseline> {
    let settings = load_effective_settings(data_dir)?;
    let history: OpsHistory = store::read_json_required(&data_dir.join(store::OPS_HISTORY))?;

    let computed = baseline::compute_baseline(&history.runs, &settings.baseline, now);
    store::write_json_pretty(&data_dir.join(store::BASELINE_OUT), &computed)?;

    log::info!(
        "baseline over {} runs: p95 {:.0} ms, {} min/run",
        computed.run_count,
        computed.p95_ms,
        computed.minutes_per_run
    );
    Ok(computed)
}

pub fn run_queue_health(data_dir: &Path, now: DateTime<Utc>) -> Result<QueueHealthSnapshot> {
    let settings = load_effective_settings(data_dir)?;
    let submissions: SubmissionsFile = store::read_json_required(&data_dir.join(store::SUBMISSIONS))?;

    let snapshot = queue_health::snapshot(&submissions.submissions, &settings.queue, now);
    store::write_json_pretty(&data_dir.join(store::QUEUE_HEALTH_OUT), &snapshot)?;

    log::info!(
        "queue: {} submissions, {} stuck, {} decided in {} days",
        snapshot.total,
        snapshot.stuck.len(),
        snapshot.throughput.decided,
        snapshot.throughput.window_days
    );
    Ok(snapshot)
}
