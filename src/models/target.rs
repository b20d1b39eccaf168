use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SCORING_VERSION: &str = "targets-v2";

/// Factor name → contribution. Score is always the sum of these values.
pub type ScoreBreakdown = BTreeMap<String, f64>;

/// Repository shape returned by the search and metadata capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRepo {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub last_pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Topic,
    Keyword,
    Comparable,
    Signal,
    Seed,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Topic => "topic",
            Strategy::Keyword => "keyword",
            Strategy::Comparable => "comparable",
            Strategy::Signal => "signal",
            Strategy::Seed => "seed",
        }
    }
}

/// One search to run during discovery. `label` ends up in `whyMatched`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryQuery {
    pub strategy: Strategy,
    pub label: String,
    pub query: String,
}

impl DiscoveryQuery {
    pub fn reason(&self) -> String {
        format!("{}:{}", self.strategy.as_str(), self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub owner: String,
    pub repo: String,
    pub full_name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub stars: u64,
    pub last_pushed_at: Option<DateTime<Utc>>,
    pub archived: bool,
    pub url: Option<String>,
    pub why_matched: Vec<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub score_breakdown: ScoreBreakdown,
}

impl Candidate {
    pub fn from_raw(raw: RawRepo, reason: String) -> Self {
        let full_name = if raw.full_name.is_empty() {
            format!("{}/{}", raw.owner, raw.name)
        } else {
            raw.full_name
        };
        Self {
            owner: raw.owner,
            repo: raw.name,
            full_name,
            description: raw.description,
            language: raw.language,
            topics: raw.topics,
            stars: raw.star_count,
            last_pushed_at: raw.last_pushed_at,
            archived: raw.archived,
            url: raw.url,
            why_matched: vec![reason],
            score: 0.0,
            score_breakdown: ScoreBreakdown::new(),
        }
    }

    pub fn add_reason(&mut self, reason: String) {
        if !self.why_matched.contains(&reason) {
            self.why_matched.push(reason);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryError {
    pub strategy: String,
    pub query: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStats {
    pub raw_candidates: usize,
    pub after_dedup: usize,
    pub after_exclusion: usize,
    pub after_scoring: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetsArtifact {
    pub generated_at: DateTime<Utc>,
    pub scoring_version: String,
    pub discovery_stats: DiscoveryStats,
    pub candidates: Vec<Candidate>,
    pub errors: Vec<DiscoveryError>,
}
