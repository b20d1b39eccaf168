use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CappedKey {
    pub day: NaiveDate,
    #[serde(rename = "type")]
    pub event_type: String,
    pub dropped: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeDay {
    pub day: NaiveDate,
    pub events: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailReport {
    pub events_capped: u64,
    pub capped_keys: Vec<CappedKey>,
    pub spike_days: Vec<SpikeDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRollup {
    pub total_events: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_slug: BTreeMap<String, u64>,
    pub by_week: BTreeMap<String, u64>,
    #[serde(default)]
    pub by_slug_type: BTreeMap<String, BTreeMap<String, u64>>,
    #[serde(default)]
    pub skipped_lines: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrails: Option<GuardrailReport>,
}
