//! Output checks run before any artifact is written. A failure here is a bug in
//! this crate, not bad input, so it aborts the run.

use crate::analysis::scoring::total;
use crate::error::{Error, Result};
use crate::models::experiment::{ArmRole, EvaluationArtifact, EvaluationStatus};
use crate::models::recommendation::RecommendationArtifact;
use crate::models::settings::ExperimentPolicy;
use crate::models::target::TargetsArtifact;
use std::collections::BTreeSet;

pub fn validate_targets(artifact: &TargetsArtifact) -> Result<()> {
    let mut names = BTreeSet::new();
    for candidate in &artifact.candidates {
        if !names.insert(candidate.full_name.to_lowercase()) {
            return Err(Error::Validation(format!("duplicate candidate {}", candidate.full_name)));
        }
        let reasons: BTreeSet<&String> = candidate.why_matched.iter().collect();
        if reasons.len() != candidate.why_matched.len() {
            return Err(Error::Validation(format!("{} has repeated whyMatched tags", candidate.full_name)));
        }
        if candidate.score != total(&candidate.score_breakdown) {
            return Err(Error::Validation(format!(
                "{} score {} does not equal its breakdown sum",
                candidate.full_name, candidate.score
            )));
        }
    }

    let stats = &artifact.discovery_stats;
    let funnel_ok = stats.after_dedup <= stats.raw_candidates
        && stats.after_exclusion <= stats.after_dedup
        && stats.after_scoring <= stats.after_exclusion
        && artifact.candidates.len() <= stats.after_scoring;
    if !funnel_ok {
        return Err(Error::Validation(format!("discovery funnel is not monotonic: {stats:?}")));
    }
    Ok(())
}

pub fn validate_evaluations(artifact: &EvaluationArtifact, policy: &ExperimentPolicy) -> Result<()> {
    for evaluation in &artifact.evaluations {
        let id = &evaluation.experiment_id;
        let thin = evaluation.control_entries < policy.min_entries
            || evaluation.variant_entries < policy.min_entries;
        if thin && (evaluation.status != EvaluationStatus::NeedsMoreData || evaluation.winner_key.is_some()) {
            return Err(Error::Validation(format!("{id}: thin arms must need more data")));
        }

        match (evaluation.status, evaluation.winner_key) {
            (EvaluationStatus::WinnerFound, Some(winner)) => {
                let (won, lost) = match winner {
                    ArmRole::Control => (evaluation.control_reply_rate, evaluation.variant_reply_rate),
                    ArmRole::Variant => (evaluation.variant_reply_rate, evaluation.control_reply_rate),
                };
                // Stored rates are rounded; rounding keeps order but may tie a real lead.
                if won < lost {
                    return Err(Error::Validation(format!("{id}: winner does not lead on reply rate")));
                }
            }
            (EvaluationStatus::WinnerFound, None) => {
                return Err(Error::Validation(format!("{id}: winner-found without a winner")));
            }
            (_, Some(_)) => {
                return Err(Error::Validation(format!("{id}: winner named without winner-found")));
            }
            _ => {}
        }
    }
    Ok(())
}

pub fn validate_recommendations(artifact: &RecommendationArtifact) -> Result<()> {
    if artifact.recommendations.len() > artifact.guardrails.max {
        return Err(Error::Validation(format!(
            "{} recommendations exceed the cap of {}",
            artifact.recommendations.len(),
            artifact.guardrails.max
        )));
    }
    let sorted = artifact
        .recommendations
        .windows(2)
        .all(|pair| pair[0].priority <= pair[1].priority);
    if !sorted {
        return Err(Error::Validation("recommendations are not ordered by priority".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::experiments::evaluate_experiment;
    use crate::models::experiment::{Evaluation, OutcomeCounts};
    use crate::models::target::{Candidate, DiscoveryStats, RawRepo};
    use chrono::{TimeZone, Utc};

    fn targets_with(candidates: Vec<Candidate>) -> TargetsArtifact {
        let n = candidates.len();
        TargetsArtifact {
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(),
            scoring_version: "test".to_string(),
            discovery_stats: DiscoveryStats {
                raw_candidates: n,
                after_dedup: n,
                after_exclusion: n,
                after_scoring: n,
            },
            candidates,
            errors: vec![],
        }
    }

    fn candidate(full_name: &str) -> Candidate {
        let (owner, name) = full_name.split_once('/').unwrap();
        let mut c = Candidate::from_raw(
            RawRepo {
                owner: owner.into(),
                name: name.into(),
                full_name: full_name.into(),
                ..RawRepo::default()
            },
            "topic:cli".into(),
        );
        c.score_breakdown.insert("topicMatch".into(), 10.0);
        c.score = 10.0;
        c
    }

    #[test]
    fn rejects_duplicate_candidates() {
        let artifact = targets_with(vec![candidate("a/b"), candidate("A/B")]);
        assert!(matches!(validate_targets(&artifact), Err(Error::Validation(_))));
    }

    #[test]
    fn rejects_score_drift() {
        let mut c = candidate("a/b");
        c.score = 11.0;
        assert!(validate_targets(&targets_with(vec![c])).is_err());
    }

    #[test]
    fn accepts_consistent_targets() {
        assert!(validate_targets(&targets_with(vec![candidate("a/b"), candidate("c/d")])).is_ok());
    }

    #[test]
    fn rejects_winner_on_thin_arms() {
        let artifact = EvaluationArtifact {
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(),
            evaluations: vec![Evaluation {
                experiment_id: "x".into(),
                status: EvaluationStatus::WinnerFound,
                control_entries: 2,
                variant_entries: 50,
                control_reply_rate: 0.0,
                variant_reply_rate: 0.5,
                winner_key: Some(ArmRole::Variant),
                recommendation: String::new(),
            }],
            warnings: vec![],
        };

        assert!(validate_evaluations(&artifact, &ExperimentPolicy::default()).is_err());
    }

    #[test]
    fn accepts_winner_whose_lead_rounds_away() {
        let policy = ExperimentPolicy {
            rate_epsilon: 0.000_001,
            ..ExperimentPolicy::default()
        };
        let control = OutcomeCounts { sent: 40_000, replied: 1, ..OutcomeCounts::default() };
        let variant = OutcomeCounts { sent: 40_000, ..OutcomeCounts::default() };

        let evaluation = evaluate_experiment("x", &control, &variant, &policy);
        assert_eq!(evaluation.status, EvaluationStatus::WinnerFound);
        assert_eq!(evaluation.winner_key, Some(ArmRole::Control));
        assert_eq!(evaluation.control_reply_rate, 0.0);

        let artifact = EvaluationArtifact {
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(),
            evaluations: vec![evaluation],
            warnings: vec![],
        };
        assert!(validate_evaluations(&artifact, &policy).is_ok());
    }

    #[test]
    fn rejects_winner_that_trails() {
        let artifact = EvaluationArtifact {
            generated_at: Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap(),
            evaluations: vec![Evaluation {
                experiment_id: "x".into(),
                status: EvaluationStatus::WinnerFound,
                control_entries: 50,
                variant_entries: 50,
                control_reply_rate: 0.4,
                variant_reply_rate: 0.1,
                winner_key: Some(ArmRole::Variant),
                recommendation: String::new(),
            }],
            warnings: vec![],
        };

        assert!(validate_evaluations(&artifact, &ExperimentPolicy::default()).is_err());
    }
}
