//! Composite readiness scoring: five weighted components summed into a
//! 0-100 score with a deterministic interpretation/recommendation ladder.

use crate::config::EngineConfig;
use crate::types::{CoverageResult, ScoreComponents, ScoreTrend, StabilityResult};

use super::stability::mean_absolute_deviation;

/// Everything the composite formula consumes, already reduced to plain
/// numbers so the scoring itself stays pure and testable.
#[derive(Debug, Clone)]
pub struct ReadinessInputs {
    /// Raw proportion correct over the attempt window, as a percentage.
    pub raw_accuracy: f64,
    /// Mean item discrimination over attempted questions, if estimation
    /// succeeded. `None` falls back to raw accuracy.
    pub avg_discrimination: Option<f64>,
    pub stability: StabilityResult,
    pub coverage: CoverageResult,
    /// Mean time per question over the window; `None` with no attempts.
    pub avg_time_ms: Option<f64>,
    /// Recent mock-exam scores feeding the consistency component.
    pub recent_scores: Vec<f64>,
}

/// IRT-weighted accuracy: the raw percentage nudged upward as a function
/// of average discrimination. The multiplier is a compatibility-preserved
/// heuristic, not a citation-backed IRT result; estimation failure
/// degrades to the raw figure.
fn irt_weighted_accuracy(raw: f64, avg_discrimination: Option<f64>) -> f64 {
    match avg_discrimination {
        Some(a) if a.is_finite() => (raw * (1.0 + (a - 1.0) * 0.1)).clamp(0.0, 100.0),
        _ => raw.clamp(0.0, 100.0),
    }
}

pub fn compute_components(inputs: &ReadinessInputs, config: &EngineConfig) -> ScoreComponents {
    let weights = &config.weights;

    let accuracy =
        irt_weighted_accuracy(inputs.raw_accuracy, inputs.avg_discrimination) / 100.0
            * weights.accuracy;

    let stability = inputs.stability.stability_score / 100.0 * weights.stability;

    let coverage = inputs.coverage.overall_coverage / 100.0 * weights.coverage;

    let speed = match inputs.avg_time_ms {
        // No observed pace is insufficient data, scored neutrally.
        None => weights.speed / 2.0,
        Some(avg) if avg <= 0.0 => weights.speed,
        Some(avg) => {
            let ideal = config.speed.ideal_time_per_question_ms as f64;
            (ideal / avg).min(1.0) * weights.speed
        }
    };

    let consistency = if inputs.recent_scores.is_empty() {
        weights.consistency / 2.0
    } else {
        let mad = mean_absolute_deviation(&inputs.recent_scores);
        (weights.consistency - (mad / 10.0) * weights.consistency).max(0.0)
    };

    ScoreComponents {
        accuracy: round2(accuracy),
        stability: round2(stability),
        coverage: round2(coverage),
        speed: round2(speed),
        consistency: round2(consistency),
    }
}

pub fn overall_score(components: &ScoreComponents) -> f64 {
    round2(components.total())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn interpretation(overall: f64) -> &'static str {
    if overall < 40.0 {
        "Early preparation: foundational gaps remain across most components."
    } else if overall < 60.0 {
        "Developing: core knowledge is forming but accuracy and coverage need work."
    } else if overall < 80.0 {
        "Approaching readiness: performance is solid with a few weak areas left."
    } else {
        "Exam ready: performance is strong and consistent across the board."
    }
}

/// Fixed, ordered recommendation ladder keyed on the score tier and the
/// stability trend. Deterministic templates, never free text.
pub fn recommendations(overall: f64, trend: ScoreTrend) -> Vec<String> {
    let mut out = Vec::new();

    if overall < 40.0 {
        out.push(
            "Focus on building fundamentals: work through untested topics before attempting full mocks."
                .to_string(),
        );
    } else if overall < 60.0 {
        out.push(
            "Target your weakest categories and raise overall accuracy above 70% before broadening practice."
                .to_string(),
        );
    } else if overall < 80.0 {
        out.push(
            "Close the remaining weak areas and add timed mock exams to consolidate your pace."
                .to_string(),
        );
    } else {
        out.push(
            "Maintain your level with regular mixed revision and full-length timed mocks."
                .to_string(),
        );
    }

    match trend {
        ScoreTrend::Declining => out.push(
            "Your recent mock scores are slipping; schedule shorter, more frequent sessions to stabilize."
                .to_string(),
        ),
        ScoreTrend::Improving => out.push(
            "Your mock scores are trending up; keep the current study rhythm.".to_string(),
        ),
        ScoreTrend::Stable => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CoverageResult;

    fn inputs() -> ReadinessInputs {
        ReadinessInputs {
            raw_accuracy: 60.0,
            avg_discrimination: None,
            stability: StabilityResult::insufficient(vec![]),
            coverage: CoverageResult {
                overall_coverage: 20.0,
                by_category: vec![],
                uncovered: vec![],
                top_covered: vec![],
            },
            avg_time_ms: Some(60_000.0),
            recent_scores: vec![],
        }
    }

    #[test]
    fn components_respect_their_maxima() {
        let config = EngineConfig::default();
        let mut i = inputs();
        i.raw_accuracy = 100.0;
        i.avg_discrimination = Some(2.5);
        i.stability.stability_score = 100.0;
        i.coverage.overall_coverage = 100.0;
        i.avg_time_ms = Some(1_000.0);
        i.recent_scores = vec![80.0; 5];

        let c = compute_components(&i, &config);
        assert!(c.accuracy <= 40.0);
        assert!(c.stability <= 20.0);
        assert!(c.coverage <= 20.0);
        assert!(c.speed <= 10.0);
        assert!(c.consistency <= 10.0);
        assert_eq!(overall_score(&c), 100.0);
    }

    #[test]
    fn discrimination_nudges_accuracy_but_failure_falls_back() {
        let weighted = irt_weighted_accuracy(60.0, Some(1.5));
        assert!((weighted - 63.0).abs() < 1e-9);

        assert_eq!(irt_weighted_accuracy(60.0, None), 60.0);
        assert_eq!(irt_weighted_accuracy(60.0, Some(f64::NAN)), 60.0);
    }

    #[test]
    fn fixture_scenario_matches_weighted_formula() {
        // Three of five correct, 60s each, one fully covered category out
        // of five, no mock exams.
        let config = EngineConfig::default();
        let i = inputs();
        let c = compute_components(&i, &config);

        assert!((c.accuracy - 24.0).abs() < 0.01);
        assert!((c.stability - 10.0).abs() < 0.01);
        assert!((c.coverage - 4.0).abs() < 0.01);
        assert!((c.speed - 10.0).abs() < 0.01);
        assert!((c.consistency - 5.0).abs() < 0.01);
        assert!((overall_score(&c) - 53.0).abs() < 0.01);
    }

    #[test]
    fn slow_pace_scales_speed_down() {
        let config = EngineConfig::default();
        let mut i = inputs();
        i.avg_time_ms = Some(180_000.0);
        let c = compute_components(&i, &config);
        assert!((c.speed - 5.0).abs() < 1e-9);
    }

    #[test]
    fn consistency_penalizes_scatter() {
        let config = EngineConfig::default();
        let mut i = inputs();
        i.recent_scores = vec![50.0, 90.0, 50.0, 90.0];
        // MAD = 20 -> component floors at 0.
        let c = compute_components(&i, &config);
        assert_eq!(c.consistency, 0.0);
    }

    #[test]
    fn recommendation_ladder_is_ordered_and_deterministic() {
        let low = recommendations(30.0, ScoreTrend::Stable);
        assert_eq!(low.len(), 1);
        assert!(low[0].contains("fundamentals"));

        let declining = recommendations(70.0, ScoreTrend::Declining);
        assert_eq!(declining.len(), 2);
        assert!(declining[1].contains("slipping"));

        let again = recommendations(70.0, ScoreTrend::Declining);
        assert_eq!(declining, again);
    }

    #[test]
    fn interpretation_tiers() {
        assert!(interpretation(10.0).contains("Early preparation"));
        assert!(interpretation(50.0).contains("Developing"));
        assert!(interpretation(70.0).contains("Approaching"));
        assert!(interpretation(90.0).contains("Exam ready"));
    }
}
