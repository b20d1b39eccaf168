use crate::commands::store;
use crate::error::Result;
use crate::models::baseline::OpsBaseline;
use crate::models::experiment::{EvaluationArtifact, EvaluationStatus};
use crate::models::recommendation::{Priority, RecommendationArtifact};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::path::Path;

const NOT_AVAILABLE: &str = "_not available_";

fn status_label(status: EvaluationStatus) -> &'static str {
    match status {
        EvaluationStatus::NeedsMoreData => "needs more data",
        EvaluationStatus::WinnerFound => "winner found",
        EvaluationStatus::NoDecision => "no decision",
    }
}

pub fn render_brief(
    now: DateTime<Utc>,
    decisions: Option<&EvaluationArtifact>,
    recommendations: Option<&RecommendationArtifact>,
    baseline: Option<&OpsBaseline>,
) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Operator brief\n");
    let _ = writeln!(md, "Generated {}\n", now.format("%Y-%m-%d %H:%M UTC"));

    let _ = writeln!(md, "## Experiments\n");
    match decisions {
        Some(artifact) if !artifact.evaluations.is_empty() => {
            let _ = writeln!(md, "| Experiment | Status | Control | Variant | Recommendation |");
            let _ = writeln!(md, "|---|---|---|---|---|");
            for e in &artifact.evaluations {
                let _ = writeln!(
                    md,
                    "| {} | {} | {:.4} ({}) | {:.4} ({}) | {} |",
                    e.experiment_id,
                    status_label(e.status),
                    e.control_reply_rate,
                    e.control_entries,
                    e.variant_reply_rate,
                    e.variant_entries,
                    e.recommendation.replace('|', "\\|"),
                );
            }
            for warning in &artifact.warnings {
                let _ = writeln!(md, "\n> {warning}");
            }
        }
        Some(_) => {
            let _ = writeln!(md, "No active experiments.");
        }
        None => {
            let _ = writeln!(md, "{NOT_AVAILABLE}");
        }
    }

    let _ = writeln!(md, "\n## Recommendations\n");
    match recommendations {
        Some(artifact) if !artifact.recommendations.is_empty() => {
            for (priority, heading) in [(Priority::High, "High"), (Priority::Medium, "Medium"), (Priority::Low, "Low")] {
                let items: Vec<_> = artifact
                    .recommendations
                    .iter()
                    .filter(|r| r.priority == priority)
                    .collect();
                if items.is_empty() {
                    continue;
                }
                let _ = writeln!(md, "### {heading}\n");
                for r in items {
                    let category = serde_json::to_value(r.category)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default();
                    let _ = writeln!(md, "- **{}** `{}`: {}", category, r.slug, r.reason);
                }
                md.push('\n');
            }
            if artifact.guardrails.dropped > 0 {
                let _ = writeln!(
                    md,
                    "{} lower-priority items were cut at the cap of {}.",
                    artifact.guardrails.dropped, artifact.guardrails.max
                );
            }
        }
        Some(_) => {
            let _ = writeln!(md, "Nothing to act on.");
        }
        None => {
            let _ = writeln!(md, "{NOT_AVAILABLE}");
        }
    }

    let _ = writeln!(md, "\n## Ops baseline\n");
    match baseline {
        Some(b) => {
            let _ = writeln!(
                md,
                "- Runs: {} ({:?} confidence)\n- Mean: {:.0} ms, p95: {:.0} ms, std dev: {:.0} ms\n- Cache hit rate: {:.2}\n- Minutes per run: {}",
                b.run_count, b.confidence, b.mean_ms, b.p95_ms, b.std_dev_ms, b.mean_cache_hit_rate, b.minutes_per_run
            );
            if let Some(warning) = &b.cache_warning {
                let _ = writeln!(md, "- Warning: {warning}");
            }
            for budget in &b.budgets {
                let _ = writeln!(
                    md,
                    "- {} ({} min/month): {} at {} min",
                    budget.tier, budget.monthly_minutes, budget.recommended_preset, budget.projected_minutes
                );
            }
        }
        None => {
            let _ = writeln!(md, "{NOT_AVAILABLE}");
        }
    }

    md
}

fn load_optional<T: DeserializeOwned>(data_dir: &Path, name: &str) -> Option<T> {
    match store::read_json_optional(&data_dir.join(name)) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("ignoring unreadable {name}: {e}");
            None
        }
    }
}

pub fn run_brief(data_dir: &Path, now: DateTime<Utc>) -> Result<String> {
    let decisions: Option<EvaluationArtifact> = load_optional(data_dir, store::DECISIONS_OUT);
    let recommendations: Option<RecommendationArtifact> = load_optional(data_dir, store::RECOMMENDATIONS_OUT);
    let baseline: Option<OpsBaseline> = load_optional(data_dir, store::BASELINE_OUT);

    let md = render_brief(now, decisions.as_ref(), recommendations.as_ref(), baseline.as_ref());
    store::write_text(&data_dir.join(store::BRIEF_OUT), &md)?;
    Ok(md)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::experiment::{ArmRole, Evaluation};
    use crate::models::recommendation::{Category, Recommendation, RecommendationGuardrails, SignalCounts};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
    }

    #[test]
    fn missing_artifacts_render_placeholders() {
        let md = render_brief(now(), None, None, None);

        assert!(md.starts_with("# Operator brief"));
        assert!(md.contains("2026-10-19 08:30 UTC"));
        assert_eq!(md.matches(NOT_AVAILABLE).count(), 3);
    }

    #[test]
    fn renders_evaluations_and_grouped_recommendations() {
        let decisions = EvaluationArtifact {
            generated_at: now(),
            evaluations: vec![Evaluation {
                experiment_id: "subject-lines".into(),
                status: EvaluationStatus::WinnerFound,
                control_entries: 10,
                variant_entries: 10,
                control_reply_rate: 0.1,
                variant_reply_rate: 0.4,
                winner_key: Some(ArmRole::Variant),
                recommendation: "Variant wins".into(),
            }],
            warnings: vec![],
        };
        let recs = RecommendationArtifact {
            generated_at: now(),
            recommendations: vec![Recommendation {
                category: Category::GraduateExperimentWinner,
                slug: "subject-lines".into(),
                priority: Priority::High,
                reason: "Variant wins".into(),
                evidence: BTreeMap::new(),
            }],
            signals: SignalCounts::default(),
            guardrails: RecommendationGuardrails { max: 20, generated: 1, dropped: 0, skipped_queued: 0 },
            lint_insights: vec![],
        };

        let md = render_brief(now(), Some(&decisions), Some(&recs), None);

        assert!(md.contains("| subject-lines | winner found | 0.1000 (10) | 0.4000 (10) | Variant wins |"));
        assert!(md.contains("### High"));
        assert!(!md.contains("### Low"));
        assert!(md.contains("**graduate-experiment-winner** `subject-lines`"));
    }
}
