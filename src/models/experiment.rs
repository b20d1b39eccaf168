use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Draft,
    Active,
    Concluded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmRef {
    /// Key into the outcome counts file.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub name: String,
    pub status: ExperimentStatus,
    pub control: ArmRef,
    pub variant: ArmRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentsFile {
    #[serde(default)]
    pub experiments: Vec<Experiment>,
}

/// Aggregated outreach outcomes for one arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub opened: u64,
    #[serde(default)]
    pub replied: u64,
    #[serde(default)]
    pub ignored: u64,
    #[serde(default)]
    pub bounced: u64,
}

impl OutcomeCounts {
    pub fn total(&self) -> u64 {
        [self.opened, self.replied, self.ignored, self.bounced]
            .into_iter()
            .fold(self.sent, u64::saturating_add)
    }
}

pub type OutcomesFile = BTreeMap<String, OutcomeCounts>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmRole {
    Control,
    Variant,
}

impl ArmRole {
    pub fn label(&self) -> &'static str {
        match self {
            ArmRole::Control => "Control",
            ArmRole::Variant => "Variant",
        }
    }

    pub fn other(&self) -> ArmRole {
        match self {
            ArmRole::Control => ArmRole::Variant,
            ArmRole::Variant => ArmRole::Control,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationStatus {
    NeedsMoreData,
    WinnerFound,
    NoDecision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub experiment_id: String,
    pub status: EvaluationStatus,
    pub control_entries: u64,
    pub variant_entries: u64,
    pub control_reply_rate: f64,
    pub variant_reply_rate: f64,
    pub winner_key: Option<ArmRole>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationArtifact {
    pub generated_at: DateTime<Utc>,
    pub evaluations: Vec<Evaluation>,
    pub warnings: Vec<String>,
}
