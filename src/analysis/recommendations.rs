use crate::analysis::stats::round_to;
use crate::models::experiment::{Evaluation, EvaluationStatus};
use crate::models::queue::{LintFailureCount, PromoQueue, QueueHealthSnapshot, Submission};
use crate::models::recommendation::{
    Category, Priority, Recommendation, RecommendationArtifact, RecommendationGuardrails, SignalCounts,
};
use crate::models::settings::RecommendationPolicy;
use crate::models::telemetry::TelemetryRollup;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Event types counted as engagement with a tool's proof material.
const PROOF_EVENT_PREFIX: &str = "proof";

/// Independent signal sources. None of them knows about the others.
pub struct RecommendationInputs<'a> {
    pub rollup: &'a TelemetryRollup,
    pub submissions: &'a [Submission],
    pub queue_health: &'a QueueHealthSnapshot,
    /// Every lint failure reason, not just the snapshot's top few.
    pub lint_failures: &'a [LintFailureCount],
    pub evaluations: &'a [Evaluation],
    pub promo_queue: &'a PromoQueue,
}

fn recommendation(
    category: Category,
    slug: &str,
    priority: Priority,
    reason: String,
    evidence: impl IntoIterator<Item = (&'static str, Value)>,
) -> Recommendation {
    Recommendation {
        category,
        slug: slug.to_string(),
        priority,
        reason,
        evidence: evidence
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Returns the recommendations plus how many slugs were skipped as already queued.
pub fn engagement_recommendations(
    rollup: &TelemetryRollup,
    promo_queue: &PromoQueue,
    policy: &RecommendationPolicy,
) -> (Vec<Recommendation>, usize) {
    let mut out = Vec::new();
    let mut skipped = 0;

    for (slug, &events) in &rollup.by_slug {
        if events < policy.high_engagement {
            continue;
        }
        if promo_queue.contains(slug) {
            skipped += 1;
            continue;
        }
        let priority = if events >= policy.high_engagement * 2 {
            Priority::High
        } else {
            Priority::Medium
        };
        out.push(recommendation(
            Category::RePromoteHighEngagement,
            slug,
            priority,
            format!("{events} engagement events, at or above the {} cutoff", policy.high_engagement),
            [("events", json!(events)), ("threshold", json!(policy.high_engagement))],
        ));
    }

    (out, skipped)
}

pub fn proof_share(by_type: &BTreeMap<String, u64>) -> f64 {
    let total: u64 = by_type.values().sum();
    if total == 0 {
        return 0.0;
    }
    let proof: u64 = by_type
        .iter()
        .filter(|(event_type, _)| event_type.starts_with(PROOF_EVENT_PREFIX))
        .map(|(_, count)| count)
        .sum();
    proof as f64 / total as f64
}

pub fn proof_recommendations(rollup: &TelemetryRollup, policy: &RecommendationPolicy) -> Vec<Recommendation> {
    rollup
        .by_slug_type
        .iter()
        .filter_map(|(slug, by_type)| {
            let events: u64 = by_type.values().sum();
            if events < policy.proof_min_events {
                return None;
            }
            let share = proof_share(by_type);
            (share < policy.proof_share_floor).then(|| {
                recommendation(
                    Category::ImproveLowProofEngagement,
                    slug,
                    Priority::Low,
                    format!(
                        "only {:.1}% of {events} events touch proof material",
                        share * 100.0
                    ),
                    [
                        ("events", json!(events)),
                        ("proofShare", json!(round_to(share, 4))),
                        ("floor", json!(policy.proof_share_floor)),
                    ],
                )
            })
        })
        .collect()
}

pub fn friction_recommendations(
    submissions: &[Submission],
    queue_health: &QueueHealthSnapshot,
    policy: &RecommendationPolicy,
) -> Vec<Recommendation> {
    submissions
        .iter()
        .filter(|s| s.is_open())
        .filter_map(|s| s.friction_score.map(|score| (s, score)))
        .filter(|(_, score)| *score >= policy.high_friction)
        .map(|(s, score)| {
            let stuck = queue_health.stuck.iter().find(|e| e.slug == s.slug);
            let priority = if stuck.is_some() { Priority::High } else { Priority::Medium };
            recommendation(
                Category::UnstickHighFrictionSubmission,
                &s.slug,
                priority,
                format!("friction score {score:.0} while {}", s.status),
                [
                    ("frictionScore", json!(score)),
                    ("status", json!(s.status)),
                    ("stuck", json!(stuck.is_some())),
                    ("ageDays", json!(stuck.map(|e| e.age_days))),
                ],
            )
        })
        .collect()
}

pub fn experiment_recommendations(evaluations: &[Evaluation]) -> Vec<Recommendation> {
    evaluations
        .iter()
        .filter(|e| e.status == EvaluationStatus::WinnerFound)
        .filter_map(|e| {
            let winner = e.winner_key?;
            Some(recommendation(
                Category::GraduateExperimentWinner,
                &e.experiment_id,
                Priority::High,
                e.recommendation.clone(),
                [
                    ("winnerKey", json!(winner)),
                    ("controlReplyRate", json!(e.control_reply_rate)),
                    ("variantReplyRate", json!(e.variant_reply_rate)),
                ],
            ))
        })
        .collect()
}

pub fn lint_recommendations(lint_failures: &[LintFailureCount], policy: &RecommendationPolicy) -> Vec<Recommendation> {
    lint_failures
        .iter()
        .filter(|failure| failure.count >= policy.common_lint_failure)
        .map(|failure| {
            let priority = if failure.count >= policy.common_lint_failure * 2 {
                Priority::High
            } else {
                Priority::Medium
            };
            recommendation(
                Category::ElevateCommonLintFailure,
                &failure.reason,
                priority,
                format!("{} submissions failed lint with '{}'", failure.count, failure.reason),
                [("count", json!(failure.count)), ("threshold", json!(policy.common_lint_failure))],
            )
        })
        .collect()
}

/// Gather every source, order by priority (stable within a tier), and cap.
pub fn synthesize(
    inputs: &RecommendationInputs<'_>,
    policy: &RecommendationPolicy,
    now: DateTime<Utc>,
) -> RecommendationArtifact {
    let (engagement, skipped_queued) =
        engagement_recommendations(inputs.rollup, inputs.promo_queue, policy);
    let proof = proof_recommendations(inputs.rollup, policy);
    let friction = friction_recommendations(inputs.submissions, inputs.queue_health, policy);
    let experiments = experiment_recommendations(inputs.evaluations);
    let lint = lint_recommendations(inputs.lint_failures, policy);

    let signals = SignalCounts {
        engagement: engagement.len(),
        proof: proof.len(),
        friction: friction.len(),
        experiments: experiments.len(),
        lint: lint.len(),
    };

    let mut recommendations: Vec<Recommendation> = engagement
        .into_iter()
        .chain(proof)
        .chain(friction)
        .chain(experiments)
        .chain(lint)
        .collect();
    recommendations.sort_by_key(|r| r.priority);

    let generated = recommendations.len();
    recommendations.truncate(policy.max_recommendations);

    RecommendationArtifact {
        generated_at: now,
        signals,
        guardrails: RecommendationGuardrails {
            max: policy.max_recommendations,
            generated,
            dropped: generated - recommendations.len(),
            skipped_queued,
        },
        lint_insights: inputs.queue_health.top_lint_failures.clone(),
        recommendations,
    }
}
