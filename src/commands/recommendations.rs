use crate::analysis::queue_health;
use crate::analysis::recommendations::{synthesize, RecommendationInputs};
use crate::analysis::validate::validate_recommendations;
use crate::commands::settings::load_effective_settings;
use crate::commands::store;
use crate::error::Result;
use crate::models::experiment::EvaluationArtifact;
use crate::models::queue::{PromoQueue, SubmissionsFile};
use crate::models::recommendation::RecommendationArtifact;
use crate::models::telemetry::TelemetryRollup;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Every source is optional; a missing one simply contributes nothing.
pub fn run_recommendations(data_dir: &Path, now: DateTime<Utc>) -> Result<RecommendationArtifact> {
    let settings = load_effective_settings(data_dir)?;

    let rollup: TelemetryRollup = store::read_json_or_default(&data_dir.join(store::TELEMETRY_OUT));
    let submissions: SubmissionsFile = store::read_json_or_default(&data_dir.join(store::SUBMISSIONS));
    let promo_queue: PromoQueue = store::read_json_or_default(&data_dir.join(store::PROMO_QUEUE));
    let evaluations = match store::read_json_optional::<EvaluationArtifact>(&data_dir.join(store::DECISIONS_OUT)) {
        Ok(Some(artifact)) => artifact.evaluations,
        Ok(None) => Vec::new(),
        Err(e) => {
            log::warn!("ignoring unreadable {}: {e}", store::DECISIONS_OUT);
            Vec::new()
        }
    };

    let health = queue_health::snapshot(&submissions.submissions, &settings.queue, now);
    let lint_failures = queue_health::lint_failure_counts(&submissions.submissions);
    let inputs = RecommendationInputs {
        rollup: &rollup,
        submissions: &submissions.submissions,
        queue_health: &health,
        lint_failures: &lint_failures,
        evaluations: &evaluations,
        promo_queue: &promo_queue,
    };

    let artifact = synthesize(&inputs, &settings.recommendations, now);
    validate_recommendations(&artifact)?;
    store::write_json_pretty(&data_dir.join(store::RECOMMENDATIONS_OUT), &artifact)?;

    log::info!(
        "{} recommendations ({} generated, {} dropped by cap)",
        artifact.recommendations.len(),
        artifact.guardrails.generated,
        artifact.guardrails.dropped
    );
    Ok(artifact)
}
