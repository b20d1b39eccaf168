use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OPEN_STATUSES: [&str; 3] = ["pending", "in-review", "needs-changes"];
pub const DECIDED_STATUSES: [&str; 2] = ["accepted", "rejected"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub slug: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub friction_score: Option<f64>,
    #[serde(default)]
    pub lint_failures: Vec<String>,
}

impl Submission {
    pub fn is_open(&self) -> bool {
        OPEN_STATUSES.contains(&self.status.as_str())
    }

    pub fn is_decided(&self) -> bool {
        DECIDED_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionsFile {
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StuckEntry {
    pub slug: String,
    pub status: String,
    pub age_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintFailureCount {
    pub reason: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Throughput {
    pub window_days: u32,
    pub decided: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueHealthSnapshot {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub stuck: Vec<StuckEntry>,
    pub top_lint_failures: Vec<LintFailureCount>,
    pub throughput: Throughput,
}

/// Promo queue items are written by hand as either `"slug"` or an object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum RawPromoEntry {
    Slug(String),
    Record {
        slug: String,
        #[serde(default)]
        channel: Option<String>,
        #[serde(default)]
        note: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPromoEntry")]
pub struct PromoQueueEntry {
    pub slug: String,
    pub channel: Option<String>,
    pub note: Option<String>,
}

impl From<RawPromoEntry> for PromoQueueEntry {
    fn from(raw: RawPromoEntry) -> Self {
        match raw {
            RawPromoEntry::Slug(slug) => PromoQueueEntry {
                slug,
                channel: None,
                note: None,
            },
            RawPromoEntry::Record {
                slug,
                channel,
                note,
            } => PromoQueueEntry {
                slug,
                channel,
                note,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoQueue {
    #[serde(default)]
    pub queue: Vec<PromoQueueEntry>,
}

impl PromoQueue {
    pub fn contains(&self, slug: &str) -> bool {
        self.queue.iter().any(|entry| entry.slug == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promo_queue_accepts_bare_slugs_and_records() {
        let queue: PromoQueue = serde_json::from_str(
            r#"{"queue": ["ripgrep", {"slug": "fd", "channel": "newsletter"}]}"#,
        )
        .unwrap();

        assert_eq!(queue.queue.len(), 2);
        assert_eq!(queue.queue[0].slug, "ripgrep");
        assert_eq!(queue.queue[0].channel, None);
        assert_eq!(queue.queue[1].slug, "fd");
        assert_eq!(queue.queue[1].channel.as_deref(), Some("newsletter"));
        assert!(queue.contains("fd"));
        assert!(!queue.contains("bat"));
    }

    #[test]
    fn open_and_decided_statuses_are_disjoint() {
        for status in OPEN_STATUSES {
            assert!(!DECIDED_STATUSES.contains(&status));
        }
    }
}
