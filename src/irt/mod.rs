//! Simplified 3-parameter Item Response Theory estimator.
//!
//! Item difficulty is the logit transform of the observed pass rate,
//! discrimination grows mildly with sample size, and guessing is fixed at
//! the reciprocal of the option count. `three_pl` is the one probability
//! formula every downstream calculation reuses; keep it that way or the
//! composite score drifts.

use std::collections::HashMap;

use crate::config::IrtParams;
use crate::types::{AbilityEstimate, Attempt, DifficultyLabel, ItemParameters};

/// Theta grid for the test information function.
pub const THETA_GRID: [f64; 7] = [-3.0, -2.0, -1.0, 0.0, 1.0, 2.0, 3.0];

const THETA_MIN: f64 = -3.0;
const THETA_MAX: f64 = 3.0;

/// P(correct | theta) under the 3PL model: c + (1-c) / (1 + e^(-a(theta-b))),
/// clamped into [0, 1].
pub fn three_pl(theta: f64, params: &ItemParameters) -> f64 {
    let a = params.discrimination;
    let b = params.difficulty;
    let c = params.guessing;
    let p = c + (1.0 - c) / (1.0 + (-a * (theta - b)).exp());
    p.clamp(0.0, 1.0)
}

/// Logit of a proportion, with the proportion clamped into
/// (eps, 1 - eps) first so degenerate pass rates never produce infinities.
fn logit_difficulty(proportion_correct: f64, eps: f64) -> f64 {
    let p = proportion_correct.clamp(eps, 1.0 - eps);
    let raw = -2.0 * (1.0 / p - 1.0).ln();
    raw.clamp(THETA_MIN, THETA_MAX)
}

/// Estimates item parameters for one question from its attempt history.
/// With no attempts the difficulty label supplies the prior.
pub fn estimate_item_parameters(
    question_id: &str,
    attempts: &[Attempt],
    label: DifficultyLabel,
    option_count: u32,
    params: &IrtParams,
) -> ItemParameters {
    let guessing = 1.0 / option_count.max(2) as f64;
    let n = attempts.len();

    if n == 0 {
        return ItemParameters {
            question_id: question_id.to_string(),
            difficulty: label.default_difficulty(),
            discrimination: params.default_discrimination,
            guessing,
            sample_size: 0,
        };
    }

    let correct = attempts.iter().filter(|a| a.is_correct).count();
    let p = correct as f64 / n as f64;
    let difficulty = logit_difficulty(p, params.proportion_epsilon);

    let discrimination = (params.default_discrimination
        + (1.0 + n as f64 / 50.0).ln() * 0.3)
        .min(params.max_discrimination);

    ItemParameters {
        question_id: question_id.to_string(),
        difficulty,
        discrimination,
        guessing,
        sample_size: n,
    }
}

/// Estimates user ability from the overall proportion correct, on the same
/// logit scale as item difficulty. Standard error shrinks with the square
/// root of the sample size down to a floor.
pub fn estimate_ability(
    user_id: &str,
    attempts: &[Attempt],
    _item_params: &HashMap<String, ItemParameters>,
    params: &IrtParams,
) -> AbilityEstimate {
    let n = attempts.len();
    if n == 0 {
        return AbilityEstimate {
            user_id: user_id.to_string(),
            theta: 0.0,
            standard_error: 2.0,
            confidence: 0.0,
            sample_size: 0,
        };
    }

    let correct = attempts.iter().filter(|a| a.is_correct).count();
    let p = correct as f64 / n as f64;
    let theta = logit_difficulty(p, params.proportion_epsilon);
    let standard_error = (2.0 / (n as f64).sqrt()).max(params.ability_se_floor);
    let confidence = (n as f64 / 100.0).min(1.0);

    AbilityEstimate {
        user_id: user_id.to_string(),
        theta,
        standard_error,
        confidence,
        sample_size: n,
    }
}

/// Fisher-information-style quantity a^2 * p'(1 - p') on the
/// guessing-corrected probability. Larger means the item discriminates
/// better at that ability.
pub fn question_information(theta: f64, params: &ItemParameters) -> f64 {
    let p = three_pl(theta, params);
    let c = params.guessing;
    let corrected = if c < 1.0 {
        ((p - c) / (1.0 - c)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    params.discrimination.powi(2) * corrected * (1.0 - corrected)
}

/// Picks the item carrying the most information at the given ability.
pub fn select_optimal_question<'a>(
    theta: f64,
    items: &'a [ItemParameters],
) -> Option<&'a ItemParameters> {
    items.iter().max_by(|a, b| {
        question_information(theta, a)
            .partial_cmp(&question_information(theta, b))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Test information function over the fixed theta grid.
pub fn test_information_function(items: &[ItemParameters]) -> Vec<(f64, f64)> {
    THETA_GRID
        .iter()
        .map(|&theta| {
            let info: f64 = items
                .iter()
                .map(|item| question_information(theta, item))
                .sum();
            (theta, info)
        })
        .collect()
}
