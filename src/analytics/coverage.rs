//! Fraction of the topic space practiced beyond a minimum-attempts
//! threshold.

use std::collections::HashMap;

use crate::config::CoverageParams;
use crate::types::{CategoryCoverage, CoverageResult};

/// Computes per-category and overall coverage. A category only counts as
/// covered at the full 100%; partial practice shows in its percentage but
/// not in the overall figure.
pub fn calculate_coverage(
    attempts_by_category: &HashMap<String, usize>,
    all_categories: &[String],
    params: &CoverageParams,
) -> CoverageResult {
    if all_categories.is_empty() {
        return CoverageResult::empty();
    }

    let min = params.min_questions_per_topic.max(1);
    let mut by_category: Vec<CategoryCoverage> = all_categories
        .iter()
        .map(|category| {
            let attempts = attempts_by_category.get(category).copied().unwrap_or(0);
            let coverage_percent = ((attempts as f64 / min as f64) * 100.0).min(100.0);
            CategoryCoverage {
                category: category.clone(),
                attempts,
                coverage_percent,
                covered: coverage_percent >= 100.0,
            }
        })
        .collect();
    by_category.sort_by(|a, b| a.category.cmp(&b.category));

    let covered = by_category.iter().filter(|c| c.covered).count();
    let overall_coverage = covered as f64 / all_categories.len() as f64 * 100.0;

    let uncovered: Vec<String> = by_category
        .iter()
        .filter(|c| !c.covered)
        .map(|c| c.category.clone())
        .collect();

    let mut ranked = by_category.clone();
    ranked.sort_by(|a, b| {
        b.coverage_percent
            .partial_cmp(&a.coverage_percent)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.attempts.cmp(&a.attempts))
            .then_with(|| a.category.cmp(&b.category))
    });
    ranked.truncate(params.top_covered);

    CoverageResult {
        overall_coverage,
        by_category,
        uncovered,
        top_covered: ranked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn category_covered_only_at_threshold() {
        let params = CoverageParams::default();
        let cats = categories(&["cardiology", "renal"]);
        let mut counts = HashMap::new();
        counts.insert("cardiology".to_string(), 5);
        counts.insert("renal".to_string(), 4);

        let result = calculate_coverage(&counts, &cats, &params);
        assert_eq!(result.overall_coverage, 50.0);
        assert_eq!(result.uncovered, vec!["renal".to_string()]);

        let renal = result
            .by_category
            .iter()
            .find(|c| c.category == "renal")
            .unwrap();
        assert_eq!(renal.coverage_percent, 80.0);
        assert!(!renal.covered);
    }

    #[test]
    fn surplus_attempts_do_not_exceed_hundred() {
        let params = CoverageParams::default();
        let cats = categories(&["cardiology"]);
        let mut counts = HashMap::new();
        counts.insert("cardiology".to_string(), 50);

        let result = calculate_coverage(&counts, &cats, &params);
        assert_eq!(result.by_category[0].coverage_percent, 100.0);
        assert_eq!(result.overall_coverage, 100.0);
    }

    #[test]
    fn top_covered_is_capped_and_ranked() {
        let params = CoverageParams::default();
        let names = ["a", "b", "c", "d", "e", "f", "g"];
        let cats = categories(&names);
        let mut counts = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            counts.insert(name.to_string(), i);
        }

        let result = calculate_coverage(&counts, &cats, &params);
        assert_eq!(result.top_covered.len(), 5);
        // "f" (5 attempts) and "g" (6) both cap at 100%; more practice
        // ranks first within the tie.
        assert_eq!(result.top_covered[0].category, "g");
        assert_eq!(result.top_covered[0].attempts, 6);
        assert_eq!(result.top_covered[1].category, "f");
    }

    #[test]
    fn no_categories_is_empty_not_nan() {
        let params = CoverageParams::default();
        let result = calculate_coverage(&HashMap::new(), &[], &params);
        assert_eq!(result.overall_coverage, 0.0);
    }
}
