//! Variance and trend of a user's recent mock-exam scores.

use crate::config::StabilityParams;
use crate::types::{ScoreTrend, StabilityResult};

/// Computes score stability from a series of mock-exam percentage scores,
/// oldest first. Fewer than `min_exams` data points is insufficient
/// evidence, not an error: the result is the neutral 50 with a stable
/// trend.
pub fn calculate_stability(series: &[f64], params: &StabilityParams) -> StabilityResult {
    let skip = series.len().saturating_sub(params.max_exams);
    let series = &series[skip..];

    if series.len() < params.min_exams {
        return StabilityResult::insufficient(series.to_vec());
    }

    let n = series.len() as f64;
    let mean = series.iter().sum::<f64>() / n;
    let variance = series.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let stability_score = (100.0 - (std_dev / params.max_std_dev) * 100.0).clamp(0.0, 100.0);

    StabilityResult {
        stability_score,
        variance,
        std_dev,
        trend: compute_trend(series, params),
        series: series.to_vec(),
    }
}

/// Compares the mean of the trailing window against the mean of everything
/// before it.
fn compute_trend(series: &[f64], params: &StabilityParams) -> ScoreTrend {
    if series.len() <= params.trend_window {
        return ScoreTrend::Stable;
    }

    let split = series.len() - params.trend_window;
    let (earlier, recent) = series.split_at(split);
    let recent_mean = recent.iter().sum::<f64>() / recent.len() as f64;
    let earlier_mean = earlier.iter().sum::<f64>() / earlier.len() as f64;
    let shift = recent_mean - earlier_mean;

    if shift > params.trend_threshold {
        ScoreTrend::Improving
    } else if shift < -params.trend_threshold {
        ScoreTrend::Declining
    } else {
        ScoreTrend::Stable
    }
}

/// Mean absolute deviation of a score series; the consistency component's
/// raw ingredient.
pub fn mean_absolute_deviation(series: &[f64]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let mean = series.iter().sum::<f64>() / series.len() as f64;
    series.iter().map(|s| (s - mean).abs()).sum::<f64>() / series.len() as f64
}
