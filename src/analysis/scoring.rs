use crate::analysis::stats::round_to;
use crate::models::settings::{PopularityTier, ScoringWeights};
use crate::models::target::{Candidate, ScoreBreakdown};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const TOPIC_MATCH: &str = "topicMatch";
pub const KEYWORD_MATCH: &str = "keywordMatch";
pub const RECENCY: &str = "recency";
pub const POPULARITY: &str = "popularity";
pub const FIT: &str = "fit";
pub const COMPARABLE_BONUS: &str = "comparableBonus";
pub const SIGNAL_BONUS: &str = "signalBonus";

/// Everything a candidate is scored against, lower-cased once up front.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub topics: BTreeSet<String>,
    pub keywords: Vec<String>,
    pub pain_points: BTreeSet<String>,
    pub weights: ScoringWeights,
    pub now: DateTime<Utc>,
}

impl ScoringContext {
    pub fn new(
        topics: &[String],
        keywords: &[String],
        pain_points: &[String],
        weights: ScoringWeights,
        now: DateTime<Utc>,
    ) -> Self {
        let normalize = |s: &String| s.trim().to_lowercase();
        Self {
            topics: topics.iter().map(normalize).filter(|s| !s.is_empty()).collect(),
            keywords: keywords.iter().map(normalize).filter(|s| !s.is_empty()).collect(),
            pain_points: pain_points.iter().map(normalize).filter(|s| !s.is_empty()).collect(),
            weights,
            now,
        }
    }
}

pub fn capped(count: usize, per_match: f64, cap: f64) -> f64 {
    (count as f64 * per_match).min(cap)
}

pub fn topic_matches(candidate: &Candidate, topics: &BTreeSet<String>) -> usize {
    candidate
        .topics
        .iter()
        .map(|t| t.to_lowercase())
        .collect::<BTreeSet<_>>()
        .intersection(topics)
        .count()
}

/// Keywords found as substrings of the repo name or description.
pub fn keyword_matches(candidate: &Candidate, keywords: &[String]) -> usize {
    let haystack = format!(
        "{} {}",
        candidate.repo.to_lowercase(),
        candidate.description.as_deref().unwrap_or("").to_lowercase()
    );
    keywords.iter().filter(|k| haystack.contains(k.as_str())).count()
}

/// Full credit when just pushed, zero at the horizon, linear in between.
pub fn recency_score(last_pushed_at: Option<DateTime<Utc>>, now: DateTime<Utc>, horizon_days: u32, cap: f64) -> f64 {
    let Some(pushed) = last_pushed_at else {
        return 0.0;
    };
    let age_days = (now - pushed).num_seconds().max(0) as f64 / 86_400.0;
    let horizon = horizon_days.max(1) as f64;
    let score = cap * (1.0 - age_days / horizon);
    round_to(score.clamp(0.0, cap), 2)
}

/// Step function: the first tier whose threshold is met wins. Tiers are
/// expected highest-first.
pub fn popularity_score(stars: u64, tiers: &[PopularityTier]) -> f64 {
    tiers
        .iter()
        .find(|tier| stars >= tier.min_stars)
        .map(|tier| tier.points)
        .unwrap_or(0.0)
}

pub fn description_tokens(description: Option<&str>) -> BTreeSet<String> {
    description
        .unwrap_or("")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub fn fit_matches(candidate: &Candidate, pain_points: &BTreeSet<String>) -> usize {
    description_tokens(candidate.description.as_deref())
        .intersection(pain_points)
        .count()
}

fn has_reason_prefix(candidate: &Candidate, prefix: &str) -> bool {
    candidate.why_matched.iter().any(|reason| reason.starts_with(prefix))
}

pub fn score_breakdown(candidate: &Candidate, ctx: &ScoringContext) -> ScoreBreakdown {
    let w = &ctx.weights;
    let mut breakdown = ScoreBreakdown::new();

    breakdown.insert(
        TOPIC_MATCH.to_string(),
        capped(topic_matches(candidate, &ctx.topics), w.topic_weight, w.topic_cap),
    );
    breakdown.insert(
        KEYWORD_MATCH.to_string(),
        capped(keyword_matches(candidate, &ctx.keywords), w.keyword_weight, w.keyword_cap),
    );
    breakdown.insert(
        RECENCY.to_string(),
        recency_score(candidate.last_pushed_at, ctx.now, w.recency_horizon_days, w.recency_cap),
    );
    breakdown.insert(
        POPULARITY.to_string(),
        popularity_score(candidate.stars, &w.popularity_tiers),
    );
    breakdown.insert(
        FIT.to_string(),
        capped(fit_matches(candidate, &ctx.pain_points), w.fit_weight, w.fit_cap),
    );
    breakdown.insert(
        COMPARABLE_BONUS.to_string(),
        if has_reason_prefix(candidate, "comparable:") { w.comparable_bonus } else { 0.0 },
    );
    breakdown.insert(
        SIGNAL_BONUS.to_string(),
        if has_reason_prefix(candidate, "signal:") { w.signal_bonus } else { 0.0 },
    );

    breakdown
}

/// The score is derived from the stored breakdown so the two can never disagree.
pub fn total(breakdown: &ScoreBreakdown) -> f64 {
    breakdown.values().sum()
}

pub fn score_candidate(candidate: &mut Candidate, ctx: &ScoringContext) {
    candidate.score_breakdown = score_breakdown(candidate, ctx);
    candidate.score = total(&candidate.score_breakdown);
}

/// Score desc, then stars desc, then full name for a total order.
pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.stars.cmp(&a.stars))
        .then_with(|| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()))
}

/// Score every candidate, drop those under `min_score`, and sort. Truncation
/// happens in the caller so the pre-truncation count stays visible.
pub fn score_and_rank(mut candidates: Vec<Candidate>, ctx: &ScoringContext, min_score: f64) -> Vec<Candidate> {
    for candidate in &mut candidates {
        score_candidate(candidate, ctx);
    }
    candidates.retain(|c| c.score >= min_score);
    candidates.sort_by(rank_order);
    candidates
}
