use crate::analysis::stats::round_to;
use crate::models::experiment::{
    ArmRole, Evaluation, EvaluationStatus, Experiment, ExperimentStatus, OutcomeCounts, OutcomesFile,
};
use crate::models::settings::ExperimentPolicy;

/// Reply rate with a zero total treated as a denominator of 1.
pub fn reply_rate(counts: &OutcomeCounts) -> f64 {
    counts.replied as f64 / counts.total().max(1) as f64
}

/// Decide one experiment from its two arms' counts. Pure; recomputed every run.
pub fn evaluate_experiment(
    experiment_id: &str,
    control: &OutcomeCounts,
    variant: &OutcomeCounts,
    policy: &ExperimentPolicy,
) -> Evaluation {
    let control_entries = control.total();
    let variant_entries = variant.total();
    let control_rate = reply_rate(control);
    let variant_rate = reply_rate(variant);

    let mut evaluation = Evaluation {
        experiment_id: experiment_id.to_string(),
        status: EvaluationStatus::NeedsMoreData,
        control_entries,
        variant_entries,
        control_reply_rate: round_to(control_rate, 4),
        variant_reply_rate: round_to(variant_rate, 4),
        winner_key: None,
        recommendation: String::new(),
    };

    if control_entries < policy.min_entries || variant_entries < policy.min_entries {
        evaluation.recommendation = format!(
            "Need at least {} entries per arm (control {control_entries}, variant {variant_entries}).",
            policy.min_entries
        );
        return evaluation;
    }

    let (leader, leader_rate, trailing_rate) = if variant_rate > control_rate {
        (ArmRole::Variant, variant_rate, control_rate)
    } else {
        (ArmRole::Control, control_rate, variant_rate)
    };
    let ratio = leader_rate / trailing_rate.max(policy.rate_epsilon);

    if ratio > policy.winner_ratio {
        evaluation.status = EvaluationStatus::WinnerFound;
        evaluation.winner_key = Some(leader);
        evaluation.recommendation = format!(
            "{} wins with {:.1}x the reply rate of {} ({:.4} vs {:.4}); graduate {}.",
            leader.label(),
            ratio,
            leader.other().label().to_lowercase(),
            round_to(leader_rate, 4),
            round_to(trailing_rate, 4),
            leader.label().to_lowercase(),
        );
    } else {
        evaluation.status = EvaluationStatus::NoDecision;
        evaluation.recommendation = format!(
            "No clear winner (control {:.4}, variant {:.4}); keep collecting data.",
            evaluation.control_reply_rate, evaluation.variant_reply_rate
        );
    }

    evaluation
}

/// Evaluate every active experiment. Returns evaluations in input order plus warnings.
pub fn evaluate_all(
    experiments: &[Experiment],
    outcomes: &OutcomesFile,
    policy: &ExperimentPolicy,
) -> (Vec<Evaluation>, Vec<String>) {
    let mut evaluations = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = std::collections::BTreeSet::new();

    for experiment in experiments {
        if experiment.status != ExperimentStatus::Active {
            continue;
        }
        if !seen.insert(experiment.id.as_str()) {
            warnings.push(format!("duplicate experiment id {}; later entry skipped", experiment.id));
            continue;
        }

        let mut lookup = |role: &str, key: &str| {
            outcomes.get(key).copied().unwrap_or_else(|| {
                warnings.push(format!(
                    "experiment {}: no outcome data for {role} arm '{key}'",
                    experiment.id
                ));
                OutcomeCounts::default()
            })
        };
        let control = lookup("control", &experiment.control.key);
        let variant = lookup("variant", &experiment.variant.key);

        evaluations.push(evaluate_experiment(&experiment.id, &control, &variant, policy));
    }

    (evaluations, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::experiment::ArmRef;

    fn counts(sent: u64, opened: u64, replied: u64, ignored: u64, bounced: u64) -> OutcomeCounts {
        OutcomeCounts {
            sent,
            opened,
            replied,
            ignored,
            bounced,
        }
    }

    fn experiment(id: &str, status: ExperimentStatus) -> Experiment {
        Experiment {
            id: id.to_string(),
            name: format!("{id} subject lines"),
            status,
            control: ArmRef { key: format!("{id}-a") },
            variant: ArmRef { key: format!("{id}-b") },
        }
    }

    #[test]
    fn variant_with_four_times_the_reply_rate_wins() {
        let control = counts(5, 2, 1, 1, 1);
        let variant = counts(3, 2, 4, 0, 1);

        let evaluation = evaluate_experiment("subject-test", &control, &variant, &ExperimentPolicy::default());

        assert_eq!(evaluation.status, EvaluationStatus::WinnerFound);
        assert_eq!(evaluation.winner_key, Some(ArmRole::Variant));
        assert_eq!(evaluation.control_reply_rate, 0.1);
        assert_eq!(evaluation.variant_reply_rate, 0.4);
        assert!(evaluation.recommendation.contains("4.0x"), "{}", evaluation.recommendation);
    }

    #[test]
    fn thin_arms_need_more_data() {
        let control = counts(50, 10, 5, 5, 0);
        let variant = counts(3, 1, 2, 0, 0);

        let evaluation = evaluate_experiment("thin", &control, &variant, &ExperimentPolicy::default());

        assert_eq!(evaluation.status, EvaluationStatus::NeedsMoreData);
        assert_eq!(evaluation.winner_key, None);
        assert_eq!(evaluation.variant_entries, 6);
    }

    #[test]
    fn close_rates_produce_no_decision() {
        let control = counts(10, 5, 3, 2, 0);
        let variant = counts(10, 5, 4, 1, 0);

        let evaluation = evaluate_experiment("close", &control, &variant, &ExperimentPolicy::default());

        assert_eq!(evaluation.status, EvaluationStatus::NoDecision);
        assert_eq!(evaluation.winner_key, None);
        assert!(evaluation.recommendation.contains("keep collecting"));
    }

    #[test]
    fn exactly_double_is_not_a_winner() {
        let control = counts(8, 0, 1, 1, 0);
        let variant = counts(8, 0, 2, 0, 0);

        let evaluation = evaluate_experiment("double", &control, &variant, &ExperimentPolicy::default());

        assert_eq!(evaluation.status, EvaluationStatus::NoDecision);
    }

    #[test]
    fn zero_reply_loser_uses_epsilon_floor() {
        let control = counts(10, 0, 1, 0, 0);
        let variant = counts(12, 0, 0, 0, 0);

        let evaluation = evaluate_experiment("floor", &control, &variant, &ExperimentPolicy::default());

        assert_eq!(evaluation.status, EvaluationStatus::WinnerFound);
        assert_eq!(evaluation.winner_key, Some(ArmRole::Control));
    }

    #[test]
    fn both_zero_rates_are_no_decision() {
        let control = counts(10, 0, 0, 0, 0);
        let variant = counts(10, 0, 0, 0, 0);

        let evaluation = evaluate_experiment("silent", &control, &variant, &ExperimentPolicy::default());

        assert_eq!(evaluation.status, EvaluationStatus::NoDecision);
    }

    #[test]
    fn zero_totals_do_not_divide_by_zero() {
        assert_eq!(reply_rate(&OutcomeCounts::default()), 0.0);
    }

    #[test]
    fn evaluate_all_skips_inactive_and_warns_on_missing_arms() {
        let experiments = vec![
            experiment("live", ExperimentStatus::Active),
            experiment("draft", ExperimentStatus::Draft),
            experiment("done", ExperimentStatus::Concluded),
            experiment("live", ExperimentStatus::Active),
        ];
        let mut outcomes = OutcomesFile::new();
        outcomes.insert("live-a".to_string(), counts(5, 2, 1, 1, 1));

        let (evaluations, warnings) = evaluate_all(&experiments, &outcomes, &ExperimentPolicy::default());

        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].experiment_id, "live");
        assert_eq!(evaluations[0].status, EvaluationStatus::NeedsMoreData);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("live-b")));
        assert!(warnings.iter().any(|w| w.contains("duplicate")));
    }
}
