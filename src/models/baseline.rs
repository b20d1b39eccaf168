use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsRun {
    pub date: NaiveDate,
    pub duration_ms: u64,
    #[serde(default)]
    pub cache_hit_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsHistory {
    #[serde(default)]
    pub runs: Vec<OpsRun>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedPreset {
    pub preset: String,
    pub projected_minutes: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBudget {
    pub tier: String,
    pub monthly_minutes: u64,
    pub recommended_preset: String,
    pub projected_minutes: u64,
    pub rejected: Vec<RejectedPreset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsBaseline {
    pub generated_at: DateTime<Utc>,
    pub run_count: usize,
    pub confidence: Confidence,
    pub mean_ms: f64,
    pub p95_ms: f64,
    pub std_dev_ms: f64,
    pub mean_cache_hit_rate: f64,
    pub cache_warning: Option<String>,
    pub minutes_per_run: u64,
    pub budgets: Vec<TierBudget>,
}
