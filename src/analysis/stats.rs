/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Nearest-rank percentile: sort ascending, take index `ceil(p × n) − 1`.
pub fn percentile_nearest_rank(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p * sorted.len() as f64).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

pub fn p95(values: &[f64]) -> f64 {
    percentile_nearest_rank(values, 0.95)
}

/// Population standard deviation (divides by n, not n − 1).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p95_of_ten_minutes_is_the_last_element() {
        let durations: Vec<f64> = (1..=10).map(|m| (m * 60_000) as f64).collect();
        assert_eq!(p95(&durations), 600_000.0);
    }

    #[test]
    fn p95_sorts_before_ranking() {
        let durations = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        // ceil(0.95 × 5) − 1 = 4
        assert_eq!(p95(&durations), 5.0);
        assert_eq!(percentile_nearest_rank(&durations, 0.5), 3.0);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(p95(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn std_dev_is_population_form() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((std_dev(&values) - 2.0).abs() < 1e-9);
        assert_eq!(mean(&values), 5.0);
    }

    #[test]
    fn rounds_to_requested_decimals() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(4.04, 1), 4.0);
    }
}
