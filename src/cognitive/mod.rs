//! Rule-based classification of incorrect attempts and rolling-window
//! error pattern mining.
//!
//! The classifier is a decision table: an ordered list of
//! (predicate, kind, confidence) rules evaluated top-down, first match
//! wins. Keep new rules in the table rather than nesting conditionals so
//! the priority order stays explicit and testable in isolation.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::ErrorRuleParams;
use crate::types::{
    Attempt, CategoryErrorStat, ClinicalPatternReport, ErrorClassification, ErrorKind,
};

/// Signals gathered for one incorrect attempt before classification.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub user_id: String,
    pub question_id: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub time_taken_ms: i64,
    pub explanation: Option<String>,
    /// A prior attempt on the same question was answered correctly.
    pub previously_correct: bool,
    /// Question stem, empty when the catalog no longer has the question.
    pub stem: String,
}

struct Rule {
    kind: ErrorKind,
    confidence: f64,
    applies: fn(&ErrorContext, &ErrorRuleParams) -> bool,
    reasoning: &'static str,
}

/// The table, in priority order. The knowledge-gap fallback is the last
/// row and matches unconditionally; it is also the hardest kind to
/// verify, hence the lowest confidence.
const RULES: &[Rule] = &[
    Rule {
        kind: ErrorKind::TimePressure,
        confidence: 0.95,
        applies: |ctx, p| {
            ctx.previously_correct
                && ctx.time_taken_ms as f64
                    >= p.time_pressure_threshold_ms as f64 * p.very_slow_multiplier
        },
        reasoning: "previously solved correctly; this attempt ran far over the time-pressure threshold",
    },
    Rule {
        kind: ErrorKind::TimePressure,
        confidence: 0.7,
        applies: |ctx, p| {
            ctx.previously_correct && ctx.time_taken_ms > p.time_pressure_threshold_ms
        },
        reasoning: "previously solved correctly but this attempt exceeded the time-pressure threshold",
    },
    Rule {
        kind: ErrorKind::DataInterpretation,
        confidence: 0.7,
        applies: |ctx, p| clinical_token_count(&ctx.stem) >= p.min_clinical_tokens,
        reasoning: "the stem is dense with numeric clinical data and the answer was wrong",
    },
    Rule {
        kind: ErrorKind::ReasoningError,
        confidence: 0.7,
        applies: |ctx, p| {
            ctx.time_taken_ms < p.fast_answer_threshold_ms
                && shared_significant_words(&ctx.user_answer, &ctx.correct_answer)
                    >= p.min_shared_words
        },
        reasoning: "a fast answer sharing vocabulary with the correct one suggests related-but-wrong thinking",
    },
    Rule {
        kind: ErrorKind::KnowledgeGap,
        confidence: 0.5,
        applies: |_, _| true,
        reasoning: "no stronger signal; treated as a gap in underlying knowledge",
    },
];

/// Classifies one incorrect attempt. Never fails: the fallback row always
/// matches.
pub fn classify(ctx: &ErrorContext, params: &ErrorRuleParams) -> ErrorClassification {
    let rule = RULES
        .iter()
        .find(|r| (r.applies)(ctx, params))
        .unwrap_or(&RULES[RULES.len() - 1]);

    ErrorClassification {
        user_id: ctx.user_id.clone(),
        question_id: ctx.question_id.clone(),
        error_kind: rule.kind,
        confidence: rule.confidence,
        evidence: build_evidence(ctx, rule.kind, params),
        reasoning: rule.reasoning.to_string(),
    }
}

fn build_evidence(
    ctx: &ErrorContext,
    kind: ErrorKind,
    params: &ErrorRuleParams,
) -> Vec<String> {
    let mut evidence = vec![format!("time_taken_ms={}", ctx.time_taken_ms)];
    match kind {
        ErrorKind::TimePressure => {
            evidence.push(format!("previously_correct={}", ctx.previously_correct));
            evidence.push(format!(
                "threshold_ms={}",
                params.time_pressure_threshold_ms
            ));
        }
        ErrorKind::DataInterpretation => {
            evidence.push(format!(
                "numeric_stem_tokens={}",
                clinical_token_count(&ctx.stem)
            ));
        }
        ErrorKind::ReasoningError => {
            evidence.push(format!(
                "shared_words={}",
                shared_significant_words(&ctx.user_answer, &ctx.correct_answer)
            ));
        }
        ErrorKind::KnowledgeGap => {}
    }
    if let Some(ref explanation) = ctx.explanation {
        evidence.push(format!("explanation={}", explanation));
    }
    evidence
}

/// Counts digit-bearing tokens in a stem; vitals and lab panels read as
/// runs of numbers ("BP 120/80, HR 110, K 5.8").
pub fn clinical_token_count(stem: &str) -> usize {
    stem.split_whitespace()
        .filter(|token| token.chars().any(|c| c.is_ascii_digit()))
        .count()
}

fn significant_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Words of four letters or more present in both answers.
pub fn shared_significant_words(a: &str, b: &str) -> usize {
    let a = significant_words(a);
    let b = significant_words(b);
    a.intersection(&b).count()
}

/// Builds a classification context for one wrong attempt out of the same
/// windowed attempt list the miner walks, so no extra store reads happen
/// per attempt.
fn context_from_window(
    attempt: &Attempt,
    window: &[Attempt],
    stems: &HashMap<String, String>,
) -> ErrorContext {
    let previously_correct = window.iter().any(|a| {
        a.question_id == attempt.question_id && a.timestamp < attempt.timestamp && a.is_correct
    });
    ErrorContext {
        user_id: attempt.user_id.clone(),
        question_id: attempt.question_id.clone(),
        user_answer: attempt.user_answer.clone().unwrap_or_default(),
        correct_answer: attempt.correct_answer.clone().unwrap_or_default(),
        time_taken_ms: attempt.time_taken_ms,
        explanation: None,
        previously_correct,
        stem: stems.get(&attempt.question_id).cloned().unwrap_or_default(),
    }
}

/// Aggregates a window of attempts into impact-tiered error categories,
/// strength categories, capped recommendations, and per-kind error
/// counts. A declared error kind on an attempt wins over re-running the
/// classifier.
pub fn mine_patterns(
    user_id: &str,
    window: &[Attempt],
    stems: &HashMap<String, String>,
    window_days: i64,
    params: &ErrorRuleParams,
) -> (ClinicalPatternReport, BTreeMap<String, usize>) {
    let mut errors_by_category: BTreeMap<String, usize> = BTreeMap::new();
    let mut correct_by_category: BTreeMap<String, usize> = BTreeMap::new();
    let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();

    for attempt in window {
        if attempt.is_correct {
            *correct_by_category
                .entry(attempt.category.clone())
                .or_default() += 1;
            continue;
        }

        *errors_by_category
            .entry(attempt.category.clone())
            .or_default() += 1;

        let kind = attempt.declared_error_kind.unwrap_or_else(|| {
            classify(&context_from_window(attempt, window, stems), params).error_kind
        });
        *kind_counts.entry(kind.as_str().to_string()).or_default() += 1;
    }

    let mut ranked: Vec<CategoryErrorStat> = errors_by_category
        .iter()
        .map(|(category, &errors)| CategoryErrorStat {
            category: category.clone(),
            errors,
        })
        .collect();
    ranked.sort_by(|a, b| b.errors.cmp(&a.errors).then_with(|| a.category.cmp(&b.category)));

    let high_impact: Vec<CategoryErrorStat> = ranked
        .iter()
        .filter(|s| s.errors >= params.high_impact_errors)
        .cloned()
        .collect();
    let medium_impact: Vec<CategoryErrorStat> = ranked
        .iter()
        .filter(|s| s.errors >= params.medium_impact_errors && s.errors < params.high_impact_errors)
        .cloned()
        .collect();
    let low_impact: Vec<CategoryErrorStat> = ranked
        .iter()
        .filter(|s| s.errors < params.medium_impact_errors)
        .cloned()
        .collect();

    let mut strengths: Vec<String> = correct_by_category
        .iter()
        .filter(|(_, &n)| n >= params.strength_min_correct)
        .map(|(category, _)| category.clone())
        .collect();
    strengths.sort_by_key(|c| {
        std::cmp::Reverse(correct_by_category.get(c).copied().unwrap_or(0))
    });

    let mut recommendations = Vec::new();
    if let Some(primary) = ranked.first() {
        recommendations.push(format!(
            "Primary focus: {} ({} recent errors). Re-study the core concepts before more practice.",
            primary.category, primary.errors
        ));
    }
    if let Some(secondary) = ranked.get(1) {
        recommendations.push(format!(
            "Secondary focus: {} ({} recent errors). Mix targeted questions into each session.",
            secondary.category, secondary.errors
        ));
    }
    if let Some(strong) = strengths.first() {
        recommendations.push(format!(
            "Maintenance: {} is holding up; keep it warm with occasional mixed revision.",
            strong
        ));
    }

    let report = ClinicalPatternReport {
        user_id: user_id.to_string(),
        window_days,
        high_impact,
        medium_impact,
        low_impact,
        strengths,
        recommendations,
    };

    (report, kind_counts)
}
