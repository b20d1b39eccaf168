use crate::analysis::discovery::{apply_exclusions, build_queries, discover, ExclusionRules, RepoSearch};
use crate::analysis::scoring::{score_and_rank, ScoringContext};
use crate::analysis::validate::validate_targets;
use crate::commands::github::GithubSearch;
use crate::commands::settings::load_effective_settings;
use crate::commands::store::{self, DayCache};
use crate::error::Result;
use crate::models::settings::Settings;
use crate::models::target::{DiscoveryStats, TargetsArtifact, SCORING_VERSION};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// Discover, score and rank against the live GitHub API, then write `targets.json`.
pub async fn run_targets(data_dir: &Path, now: DateTime<Utc>) -> Result<TargetsArtifact> {
    let settings = load_effective_settings(data_dir)?;
    let cache = DayCache::new(data_dir.join("cache"), now.date_naive());
    let mut searcher = GithubSearch::new(
        std::env::var("GITHUB_TOKEN").ok(),
        settings.targets.per_query,
        Duration::from_millis(settings.request_delay_ms),
        Some(cache),
    )?;

    let artifact = run_targets_internal(data_dir, &settings, &mut searcher, now).await?;
    log::info!(
        "github: {} requests, {} retries, {} cache hits{}",
        searcher.stats.requests,
        searcher.stats.retries,
        searcher.stats.cache_hits,
        if searcher.stats.rate_limited { ", rate limited" } else { "" }
    );
    Ok(artifact)
}

pub async fn run_targets_internal<S>(
    data_dir: &Path,
    settings: &Settings,
    searcher: &mut S,
    now: DateTime<Utc>,
) -> Result<TargetsArtifact>
where
    S: RepoSearch + ?Sized,
{
    let artifact = build_targets(settings, searcher, now).await;
    validate_targets(&artifact)?;
    store::write_json_pretty(&data_dir.join(store::TARGETS_OUT), &artifact)?;
    Ok(artifact)
}

pub async fn build_targets<S>(settings: &Settings, searcher: &mut S, now: DateTime<Utc>) -> TargetsArtifact
where
    S: RepoSearch + ?Sized,
{
    let targets = &settings.targets;
    let queries = build_queries(targets);
    let outcome = discover(searcher, &queries, &targets.seed_repos).await;

    let raw_candidates = outcome.raw_count;
    let after_dedup = outcome.candidates.len();
    let kept = apply_exclusions(outcome.candidates, &ExclusionRules::from_settings(targets));
    let after_exclusion = kept.len();

    let ctx = ScoringContext::new(
        &targets.topics,
        &targets.keywords,
        &targets.pain_points,
        settings.scoring.clone(),
        now,
    );
    let mut ranked = score_and_rank(kept, &ctx, targets.min_score);
    let after_scoring = ranked.len();
    ranked.truncate(targets.top_n);

    log::info!(
        "targets: {raw_candidates} raw -> {after_dedup} deduped -> {after_exclusion} kept -> {after_scoring} scored, top {} written",
        ranked.len()
    );

    TargetsArtifact {
        generated_at: now,
        scoring_version: SCORING_VERSION.to_string(),
        discovery_stats: DiscoveryStats {
            raw_candidates,
            after_dedup,
            after_exclusion,
            after_scoring,
        },
        candidates: ranked,
        errors: outcome.errors,
    }
}
