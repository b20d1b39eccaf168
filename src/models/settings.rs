use serde::{Deserialize, Serialize};

/// Fully sanitized settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub schema_version: i64,
    pub request_delay_ms: u64,
    pub targets: TargetSettings,
    pub scoring: ScoringWeights,
    pub experiments: ExperimentPolicy,
    pub recommendations: RecommendationPolicy,
    pub queue: QueuePolicy,
    pub telemetry: GuardrailPolicy,
    pub baseline: BaselinePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 0,
            request_delay_ms: 1000,
            targets: TargetSettings::default(),
            scoring: ScoringWeights::default(),
            experiments: ExperimentPolicy::default(),
            recommendations: RecommendationPolicy::default(),
            queue: QueuePolicy::default(),
            telemetry: GuardrailPolicy::default(),
            baseline: BaselinePolicy::default(),
        }
    }
}

/// What discovery looks for and what it must ignore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetSettings {
    pub topics: Vec<String>,
    pub keywords: Vec<String>,
    pub comparables: Vec<String>,
    pub signal_orgs: Vec<String>,
    pub seed_repos: Vec<String>,
    pub pain_points: Vec<String>,
    pub denylist: Vec<String>,
    pub publisher_accounts: Vec<String>,
    pub per_query: u32,
    pub top_n: usize,
    pub min_score: f64,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            keywords: Vec::new(),
            comparables: Vec::new(),
            signal_orgs: Vec::new(),
            seed_repos: Vec::new(),
            pain_points: Vec::new(),
            denylist: Vec::new(),
            publisher_accounts: Vec::new(),
            per_query: 30,
            top_n: 50,
            min_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularityTier {
    pub min_stars: u64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringWeights {
    pub topic_weight: f64,
    pub topic_cap: f64,
    pub keyword_weight: f64,
    pub keyword_cap: f64,
    pub recency_cap: f64,
    pub recency_horizon_days: u32,
    /// Checked in order; the first tier met wins.
    pub popularity_tiers: Vec<PopularityTier>,
    pub fit_weight: f64,
    pub fit_cap: f64,
    pub comparable_bonus: f64,
    pub signal_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            topic_weight: 10.0,
            topic_cap: 30.0,
            keyword_weight: 5.0,
            keyword_cap: 20.0,
            recency_cap: 20.0,
            recency_horizon_days: 365,
            popularity_tiers: vec![
                PopularityTier { min_stars: 10_000, points: 15.0 },
                PopularityTier { min_stars: 1_000, points: 10.0 },
                PopularityTier { min_stars: 100, points: 5.0 },
                PopularityTier { min_stars: 10, points: 2.0 },
            ],
            fit_weight: 3.0,
            fit_cap: 15.0,
            comparable_bonus: 10.0,
            signal_bonus: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperimentPolicy {
    pub min_entries: u64,
    pub winner_ratio: f64,
    pub rate_epsilon: f64,
}

impl Default for ExperimentPolicy {
    fn default() -> Self {
        Self {
            min_entries: 10,
            winner_ratio: 2.0,
            rate_epsilon: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationPolicy {
    pub high_engagement: u64,
    pub proof_min_events: u64,
    pub proof_share_floor: f64,
    pub high_friction: f64,
    pub common_lint_failure: usize,
    pub max_recommendations: usize,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            high_engagement: 20,
            proof_min_events: 10,
            proof_share_floor: 0.05,
            high_friction: 70.0,
            common_lint_failure: 3,
            max_recommendations: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueuePolicy {
    pub stuck_days: i64,
    pub top_lint_failures: usize,
    pub throughput_window_days: u32,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            stuck_days: 14,
            top_lint_failures: 5,
            throughput_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardrailPolicy {
    pub enabled: bool,
    pub per_day_type_cap: u64,
    pub spike_threshold: u64,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            per_day_type_cap: 50,
            spike_threshold: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingTier {
    pub name: String,
    pub monthly_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaselinePolicy {
    pub cache_hit_warning: f64,
    pub budget_headroom: f64,
    pub tiers: Vec<SpendingTier>,
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        Self {
            cache_hit_warning: 0.70,
            budget_headroom: 0.8,
            tiers: vec![
                SpendingTier { name: "free".to_string(), monthly_minutes: 2_000 },
                SpendingTier { name: "team".to_string(), monthly_minutes: 3_000 },
                SpendingTier { name: "enterprise".to_string(), monthly_minutes: 50_000 },
            ],
        }
    }
}
