use crate::models::queue::{LintFailureCount, QueueHealthSnapshot, StuckEntry, Submission, Throughput};
use crate::models::settings::QueuePolicy;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

pub fn age_days(submission: &Submission, now: DateTime<Utc>) -> i64 {
    (now - submission.submitted_at).num_days().max(0)
}

/// Open submissions older than the threshold, oldest first.
pub fn stuck_entries(submissions: &[Submission], policy: &QueuePolicy, now: DateTime<Utc>) -> Vec<StuckEntry> {
    let mut stuck: Vec<StuckEntry> = submissions
        .iter()
        .filter(|s| s.is_open())
        .map(|s| StuckEntry {
            slug: s.slug.clone(),
            status: s.status.clone(),
            age_days: age_days(s, now),
        })
        .filter(|entry| entry.age_days > policy.stuck_days)
        .collect();
    stuck.sort_by(|a, b| b.age_days.cmp(&a.age_days).then_with(|| a.slug.cmp(&b.slug)));
    stuck
}

/// Every lint failure reason with its count, most frequent first.
pub fn lint_failure_counts(submissions: &[Submission]) -> Vec<LintFailureCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for reason in submissions.iter().flat_map(|s| s.lint_failures.iter()) {
        let reason = reason.trim();
        if !reason.is_empty() {
            *counts.entry(reason).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<LintFailureCount> = counts
        .into_iter()
        .map(|(reason, count)| LintFailureCount {
            reason: reason.to_string(),
            count,
        })
        .collect();
    // BTreeMap order already has reasons ascending; a stable sort keeps that for ties.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

pub fn throughput(submissions: &[Submission], window_days: u32, now: DateTime<Utc>) -> Throughput {
    let since = now - Duration::days(i64::from(window_days));
    let decided = submissions
        .iter()
        .filter(|s| s.is_decided())
        .filter(|s| s.updated_at.is_some_and(|at| at >= since && at <= now))
        .count();
    Throughput { window_days, decided }
}

pub fn snapshot(submissions: &[Submission], policy: &QueuePolicy, now: DateTime<Utc>) -> QueueHealthSnapshot {
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    for submission in submissions {
        *by_status.entry(submission.status.clone()).or_insert(0) += 1;
    }

    let mut top_lint_failures = lint_failure_counts(submissions);
    top_lint_failures.truncate(policy.top_lint_failures);

    QueueHealthSnapshot {
        generated_at: now,
        total: submissions.len(),
        by_status,
        stuck: stuck_entries(submissions, policy, now),
        top_lint_failures,
        throughput: throughput(submissions, policy.throughput_window_days, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn submission(slug: &str, status: &str, age: i64, lint: &[&str]) -> Submission {
        Submission {
            slug: slug.to_string(),
            status: status.to_string(),
            submitted_at: now() - Duration::days(age),
            updated_at: Some(now() - Duration::days(age.min(3))),
            friction_score: None,
            lint_failures: lint.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn finds_stuck_open_entries_oldest_first() {
        let subs = vec![
            submission("a", "pending", 20, &[]),
            submission("b", "in-review", 40, &[]),
            submission("c", "accepted", 90, &[]),
            submission("d", "pending", 14, &[]),
        ];

        let stuck = stuck_entries(&subs, &QueuePolicy::default(), now());
        let slugs: Vec<&str> = stuck.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["b", "a"]);
        assert_eq!(stuck[0].age_days, 40);
    }

    #[test]
    fn ranks_lint_failures_by_count_then_reason() {
        let subs = vec![
            submission("a", "pending", 1, &["missing-license", "no-readme"]),
            submission("b", "pending", 1, &["no-readme", "bad-url"]),
            submission("c", "pending", 1, &["missing-license"]),
        ];

        let ranked = lint_failure_counts(&subs);
        let reasons: Vec<(&str, usize)> = ranked.iter().map(|r| (r.reason.as_str(), r.count)).collect();
        assert_eq!(
            reasons,
            vec![("missing-license", 2), ("no-readme", 2), ("bad-url", 1)]
        );
    }

    #[test]
    fn throughput_counts_recent_decisions_only() {
        let mut old = submission("old", "accepted", 30, &[]);
        old.updated_at = Some(now() - Duration::days(10));
        let subs = vec![
            submission("new", "accepted", 5, &[]),
            submission("rej", "rejected", 2, &[]),
            submission("open", "pending", 2, &[]),
            old,
        ];

        assert_eq!(throughput(&subs, 7, now()).decided, 2);
    }

    #[test]
    fn snapshot_counts_statuses_and_truncates_lint() {
        let subs = vec![
            submission("a", "pending", 1, &["r1", "r2", "r3"]),
            submission("b", "accepted", 1, &["r4"]),
        ];
        let policy = QueuePolicy {
            top_lint_failures: 2,
            ..QueuePolicy::default()
        };

        let snap = snapshot(&subs, &policy, now());
        assert_eq!(snap.total, 2);
        assert_eq!(snap.by_status["pending"], 1);
        assert_eq!(snap.top_lint_failures.len(), 2);
        assert!(snap.stuck.is_empty());
    }
}
