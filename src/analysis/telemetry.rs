use crate::models::settings::GuardrailPolicy;
use crate::models::telemetry::{CappedKey, GuardrailReport, SpikeDay, TelemetryEvent, TelemetryRollup};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::BTreeMap;

/// ISO week key, e.g. `2026-W43`.
pub fn week_key(ts: DateTime<Utc>) -> String {
    let week = ts.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// Parse JSONL lines, counting the ones that are not valid events.
pub fn parse_events(lines: &[String]) -> (Vec<TelemetryEvent>, u64) {
    let mut events = Vec::with_capacity(lines.len());
    let mut skipped = 0;
    for line in lines {
        match serde_json::from_str::<TelemetryEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                log::debug!("skipping telemetry line: {e}");
                skipped += 1;
            }
        }
    }
    (events, skipped)
}

/// Fold events into counts. With guardrails, events past the per-day-per-type
/// cap are dropped (first come, first counted) and days whose raw volume
/// exceeds the spike threshold are flagged.
pub fn rollup(events: &[TelemetryEvent], guardrails: Option<&GuardrailPolicy>) -> TelemetryRollup {
    let mut out = TelemetryRollup::default();
    let mut per_day_type: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
    let mut dropped: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
    let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for event in events {
        let day = event.ts.date_naive();
        *per_day.entry(day).or_insert(0) += 1;

        if let Some(policy) = guardrails {
            let seen = per_day_type.entry((day, event.event_type.clone())).or_insert(0);
            *seen += 1;
            if *seen > policy.per_day_type_cap {
                *dropped.entry((day, event.event_type.clone())).or_insert(0) += 1;
                continue;
            }
        }

        out.total_events += 1;
        *out.by_type.entry(event.event_type.clone()).or_insert(0) += 1;
        *out.by_week.entry(week_key(event.ts)).or_insert(0) += 1;
        if let Some(slug) = event.slug.as_deref().filter(|s| !s.is_empty()) {
            *out.by_slug.entry(slug.to_string()).or_insert(0) += 1;
            *out
                .by_slug_type
                .entry(slug.to_string())
                .or_default()
                .entry(event.event_type.clone())
                .or_insert(0) += 1;
        }
    }

    if let Some(policy) = guardrails {
        let capped_keys: Vec<CappedKey> = dropped
            .into_iter()
            .map(|((day, event_type), count)| CappedKey {
                day,
                event_type,
                dropped: count,
            })
            .collect();
        let spike_days = per_day
            .into_iter()
            .filter(|(_, count)| *count > policy.spike_threshold)
            .map(|(day, events)| SpikeDay { day, events })
            .collect();

        out.guardrails = Some(GuardrailReport {
            events_capped: capped_keys.iter().map(|k| k.dropped).sum(),
            capped_keys,
            spike_days,
        });
    }

    out
}
