use crate::analysis::experiments::evaluate_all;
use crate::analysis::validate::validate_evaluations;
use crate::commands::settings::load_effective_settings;
use crate::commands::store;
use crate::error::Result;
use crate::models::experiment::{EvaluationArtifact, ExperimentsFile, OutcomesFile};
use chrono::{DateTime, Utc};
use std::path::Path;

pub fn run_experiment_decisions(data_dir: &Path, now: DateTime<Utc>) -> Result<EvaluationArtifact> {
    let settings = load_effective_settings(data_dir)?;
    let experiments: ExperimentsFile = store::read_json_required(&data_dir.join(store::EXPERIMENTS))?;
    let outcomes: OutcomesFile = store::read_json_or_default(&data_dir.join(store::EXPERIMENT_OUTCOMES));

    let (evaluations, warnings) = evaluate_all(&experiments.experiments, &outcomes, &settings.experiments);
    for warning in &warnings {
        log::warn!("{warning}");
    }

    let artifact = EvaluationArtifact {
        generated_at: now,
        evaluations,
        warnings,
    };
    validate_evaluations(&artifact, &settings.experiments)?;
    store::write_json_pretty(&data_dir.join(store::DECISIONS_OUT), &artifact)?;

    log::info!("evaluated {} active experiments", artifact.evaluations.len());
    Ok(artifact)
}
