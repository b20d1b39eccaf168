use crate::analysis::stats::{self, round_to};
use crate::models::baseline::{Confidence, OpsBaseline, OpsRun, RejectedPreset, TierBudget};
use crate::models::settings::{BaselinePolicy, SpendingTier};
use chrono::{DateTime, Utc};

/// Cadence presets, most aggressive first, with runs per month.
pub const PRESETS: [(&str, u64); 4] = [
    ("hourly", 720),
    ("twice-daily", 60),
    ("daily", 30),
    ("weekly", 4),
];

const FALLBACK_PRESET: (&str, u64) = ("weekly", 4);

pub fn confidence_for(run_count: usize) -> Confidence {
    match run_count {
        0..=4 => Confidence::Low,
        5..=19 => Confidence::Medium,
        _ => Confidence::High,
    }
}

/// Billable minutes per run from the p95 duration; never below one.
pub fn minutes_per_run(p95_ms: f64) -> u64 {
    ((p95_ms / 60_000.0).ceil() as u64).max(1)
}

/// Pick the most aggressive preset that fits the tier's budget after headroom.
pub fn budget_for_tier(tier: &SpendingTier, minutes_per_run: u64, headroom: f64) -> TierBudget {
    let allowance = (tier.monthly_minutes as f64 * headroom).floor() as u64;
    let mut rejected = Vec::new();

    for (preset, runs) in PRESETS {
        let projected = runs * minutes_per_run;
        if projected <= allowance {
            return TierBudget {
                tier: tier.name.clone(),
                monthly_minutes: tier.monthly_minutes,
                recommended_preset: preset.to_string(),
                projected_minutes: projected,
                rejected,
            };
        }
        rejected.push(RejectedPreset {
            preset: preset.to_string(),
            projected_minutes: projected,
            reason: format!(
                "{preset} needs {projected} min/month ({runs} runs x {minutes_per_run} min), over the {allowance} min allowance"
            ),
        });
    }

    // Nothing fits; fall back to the slowest cadence and say so.
    let (preset, runs) = FALLBACK_PRESET;
    let projected = runs * minutes_per_run;
    rejected.retain(|r| r.preset != preset);
    rejected.push(RejectedPreset {
        preset: preset.to_string(),
        projected_minutes: projected,
        reason: format!("even {preset} overruns the {allowance} min allowance; kept as the floor"),
    });
    TierBudget {
        tier: tier.name.clone(),
        monthly_minutes: tier.monthly_minutes,
        recommended_preset: preset.to_string(),
        projected_minutes: projected,
        rejected,
    }
}

pub fn compute_baseline(runs: &[OpsRun], policy: &BaselinePolicy, now: DateTime<Utc>) -> OpsBaseline {
    let durations: Vec<f64> = runs.iter().map(|r| r.duration_ms as f64).collect();
    let hit_rates: Vec<f64> = runs.iter().map(|r| r.cache_hit_rate.clamp(0.0, 1.0)).collect();

    let p95_ms = stats::p95(&durations);
    let mean_cache_hit_rate = round_to(stats::mean(&hit_rates), 4);
    let per_run = minutes_per_run(p95_ms);

    let cache_warning = (!runs.is_empty() && mean_cache_hit_rate < policy.cache_hit_warning).then(|| {
        format!(
            "mean cache hit rate {:.2} is below the {:.2} target",
            mean_cache_hit_rate, policy.cache_hit_warning
        )
    });
    if let Some(warning) = &cache_warning {
        log::warn!("{warning}");
    }

    OpsBaseline {
        generated_at: now,
        run_count: runs.len(),
        confidence: confidence_for(runs.len()),
        mean_ms: round_to(stats::mean(&durations), 2),
        p95_ms,
        std_dev_ms: round_to(stats::std_dev(&durations), 2),
        mean_cache_hit_rate,
        cache_warning,
        minutes_per_run: per_run,
        budgets: policy
            .tiers
            .iter()
            .map(|tier| budget_for_tier(tier, per_run, policy.budget_headroom))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
    }

    fn run(day: u32, duration_ms: u64, cache_hit_rate: f64) -> OpsRun {
        OpsRun {
            date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
            duration_ms,
            cache_hit_rate,
        }
    }

    #[test]
    fn zero_runs_yield_the_zero_state() {
        let baseline = compute_baseline(&[], &BaselinePolicy::default(), now());

        assert_eq!(baseline.run_count, 0);
        assert_eq!(baseline.confidence, Confidence::Low);
        assert_eq!(baseline.mean_ms, 0.0);
        assert_eq!(baseline.p95_ms, 0.0);
        assert_eq!(baseline.minutes_per_run, 1);
        assert!(baseline.cache_warning.is_none());
        assert_eq!(baseline.budgets.len(), 3);
    }

    #[test]
    fn ten_runs_use_nearest_rank_p95() {
        let runs: Vec<OpsRun> = (1..=10).map(|m| run(m, m as u64 * 60_000, 0.9)).collect();

        let baseline = compute_baseline(&runs, &BaselinePolicy::default(), now());

        assert_eq!(baseline.p95_ms, 600_000.0);
        assert_eq!(baseline.mean_ms, 330_000.0);
        assert_eq!(baseline.minutes_per_run, 10);
        assert_eq!(baseline.confidence, Confidence::Medium);
        assert!(baseline.cache_warning.is_none());
    }

    #[test]
    fn low_cache_hit_rate_warns() {
        let runs = vec![run(1, 60_000, 0.5), run(2, 60_000, 0.6)];
        let baseline = compute_baseline(&runs, &BaselinePolicy::default(), now());

        assert_eq!(baseline.mean_cache_hit_rate, 0.55);
        assert!(baseline.cache_warning.unwrap().contains("0.70"));
    }

    #[test]
    fn tier_budget_explains_rejected_presets() {
        let tier = SpendingTier {
            name: "free".to_string(),
            monthly_minutes: 2_000,
        };

        // 3 min/run against a 1600 min allowance: hourly 2160 fails, twice-daily 180 fits.
        let budget = budget_for_tier(&tier, 3, 0.8);

        assert_eq!(budget.recommended_preset, "twice-daily");
        assert_eq!(budget.projected_minutes, 180);
        assert_eq!(budget.rejected.len(), 1);
        assert_eq!(budget.rejected[0].preset, "hourly");
        assert!(budget.rejected[0].reason.contains("2160"));
    }

    #[test]
    fn nothing_fitting_falls_back_to_weekly() {
        let tier = SpendingTier {
            name: "tiny".to_string(),
            monthly_minutes: 10,
        };

        let budget = budget_for_tier(&tier, 5, 0.8);

        assert_eq!(budget.recommended_preset, "weekly");
        assert_eq!(budget.projected_minutes, 20);
        assert_eq!(budget.rejected.len(), 4);
        assert!(budget.rejected.last().unwrap().reason.contains("floor"));
    }
}
