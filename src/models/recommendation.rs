use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::queue::LintFailureCount;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    RePromoteHighEngagement,
    ImproveLowProofEngagement,
    UnstickHighFrictionSubmission,
    GraduateExperimentWinner,
    ElevateCommonLintFailure,
}

/// Declaration order is sort order: high first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub category: Category,
    pub slug: String,
    pub priority: Priority,
    pub reason: String,
    pub evidence: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalCounts {
    pub engagement: usize,
    pub proof: usize,
    pub friction: usize,
    pub experiments: usize,
    pub lint: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationGuardrails {
    pub max: usize,
    pub generated: usize,
    pub dropped: usize,
    pub skipped_queued: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationArtifact {
    pub generated_at: DateTime<Utc>,
    pub recommendations: Vec<Recommendation>,
    pub signals: SignalCounts,
    pub guardrails: RecommendationGuardrails,
    pub lint_insights: Vec<LintFailureCount>,
}
