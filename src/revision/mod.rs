//! Revision bucket generation, spaced scheduling and mastery pruning.
//!
//! Buckets are rebuilt from scratch on every pass over the recent
//! attempt window; nothing is patched incrementally, so a question that
//! stops qualifying simply stops appearing.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;

use crate::config::RevisionParams;
use crate::types::{Attempt, BucketType, Priority, RevisionBucket, RevisionDay, RevisionSchedule};

/// Builds the four revision buckets from a window of recent attempts.
/// Empty buckets are dropped. Emission order doubles as review priority:
/// high-yield and confidently-wrong first, slow-but-correct last.
pub fn generate_buckets(
    user_id: &str,
    window: &[Attempt],
    params: &RevisionParams,
) -> Vec<RevisionBucket> {
    let window = if window.len() > params.attempt_window {
        &window[..params.attempt_window]
    } else {
        window
    };
    let generated_at = Utc::now().timestamp_millis();

    let candidates = [
        (
            BucketType::HighYieldLowAccuracy,
            Priority::High,
            high_yield_low_accuracy(window, params),
            "Weak in a heavily-tested category; fixing these moves the score most.",
        ),
        (
            BucketType::IncorrectConfident,
            Priority::High,
            incorrect_confident(window, params),
            "Answered wrong with high confidence; likely a settled misconception.",
        ),
        (
            BucketType::AlmostCorrect,
            Priority::Medium,
            almost_correct(window, params),
            "Answers landed close to the mark; a short review should convert these.",
        ),
        (
            BucketType::SlowCorrect,
            Priority::Low,
            slow_correct(window, params),
            "Correct but well over your usual pace; drill for fluency.",
        ),
    ];

    candidates
        .into_iter()
        .filter(|(_, _, questions, _)| !questions.is_empty())
        .map(|(bucket_type, priority, mut questions, reason)| {
            questions.truncate(params.bucket_limit);
            let suggested_duration_minutes = (10 + 2 * questions.len() as u32).min(60);
            RevisionBucket {
                user_id: user_id.to_string(),
                bucket_type,
                questions,
                priority,
                suggested_duration_minutes,
                reason: reason.to_string(),
                generated_at,
            }
        })
        .collect()
}

/// Correct answers slower than the user's own 90th-percentile time.
fn slow_correct(window: &[Attempt], params: &RevisionParams) -> Vec<String> {
    let mut times: Vec<i64> = window.iter().map(|a| a.time_taken_ms).collect();
    if times.is_empty() {
        return Vec::new();
    }
    times.sort_unstable();
    let rank = ((times.len() as f64 * params.slow_percentile).ceil() as usize).max(1);
    let p90 = times[rank - 1];

    dedupe(
        window
            .iter()
            .filter(|a| a.is_correct && a.time_taken_ms > p90)
            .map(|a| a.question_id.clone()),
    )
}

/// Wrong answers given with declared confidence at or above the cutoff.
fn incorrect_confident(window: &[Attempt], params: &RevisionParams) -> Vec<String> {
    dedupe(
        window
            .iter()
            .filter(|a| {
                !a.is_correct
                    && a.confidence
                        .map_or(false, |c| c >= params.confident_wrong_threshold)
            })
            .map(|a| a.question_id.clone()),
    )
}

/// Wrong attempts in categories the user has tried often and still gets
/// wrong too much.
fn high_yield_low_accuracy(window: &[Attempt], params: &RevisionParams) -> Vec<String> {
    let mut per_category: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for a in window {
        let entry = per_category.entry(a.category.as_str()).or_default();
        entry.0 += 1;
        if a.is_correct {
            entry.1 += 1;
        }
    }

    let weak: HashSet<&str> = per_category
        .iter()
        .filter(|(_, (total, correct))| {
            *total >= params.high_yield_min_attempts
                && (*correct as f64 / *total as f64) < params.high_yield_accuracy_cutoff
        })
        .map(|(category, _)| *category)
        .collect();

    dedupe(
        window
            .iter()
            .filter(|a| !a.is_correct && weak.contains(a.category.as_str()))
            .map(|a| a.question_id.clone()),
    )
}

/// Wrong answers whose length is within a small margin of the correct
/// one. Crude proxy for "nearly had it", but cheap and surprisingly
/// effective on free-text answers.
fn almost_correct(window: &[Attempt], params: &RevisionParams) -> Vec<String> {
    dedupe(
        window
            .iter()
            .filter(|a| {
                if a.is_correct {
                    return false;
                }
                match (&a.user_answer, &a.correct_answer) {
                    (Some(user), Some(correct)) => {
                        let delta = user.chars().count().abs_diff(correct.chars().count());
                        delta <= params.almost_correct_margin_chars
                    }
                    _ => false,
                }
            })
            .map(|a| a.question_id.clone()),
    )
}

fn dedupe(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}

/// Spreads buckets over the days left before the exam. High-priority
/// buckets recur on days 1, 4, 7, ... up to day 14 and medium-priority
/// on days 2, 4, 6, ... up to day 21, both bounded by the exam date.
/// Low-priority buckets stay available for ad-hoc review but get no
/// fixed slot.
pub fn build_schedule(
    user_id: &str,
    days_until_exam: u32,
    buckets: &[RevisionBucket],
    params: &RevisionParams,
) -> RevisionSchedule {
    let mut days: Vec<RevisionDay> = Vec::new();

    for bucket in buckets {
        let slots: Vec<u32> = match bucket.priority {
            Priority::High => {
                let horizon = days_until_exam.min(params.high_priority_horizon_days);
                (1..=horizon).step_by(3).collect()
            }
            Priority::Medium => {
                let horizon = days_until_exam.min(params.medium_priority_horizon_days);
                (2..=horizon).step_by(2).collect()
            }
            Priority::Low => Vec::new(),
        };

        for day in slots {
            days.push(RevisionDay {
                day,
                bucket_type: bucket.bucket_type,
                questions: bucket.questions.clone(),
                duration_minutes: bucket.suggested_duration_minutes,
            });
        }
    }

    days.sort_by_key(|d| d.day);

    RevisionSchedule {
        user_id: user_id.to_string(),
        days_until_exam,
        days,
    }
}

/// A question is mastered once the trailing window holds enough correct
/// attempts; mastered questions are pruned from every bucket.
pub fn is_mastered(
    question_id: &str,
    attempts: &[Attempt],
    now_ms: i64,
    params: &RevisionParams,
) -> bool {
    let cutoff = now_ms - params.mastery_window_days * 24 * 60 * 60 * 1000;
    let recent_correct = attempts
        .iter()
        .filter(|a| a.question_id == question_id && a.is_correct && a.timestamp >= cutoff)
        .count();
    recent_correct >= params.mastery_required_correct
}

/// Prunes every question already mastered inside the window. Runs at
/// generation time so an old wrong attempt cannot resurrect a question
/// the learner has since answered correctly enough times.
pub fn prune_all_mastered(
    buckets: &mut Vec<RevisionBucket>,
    window: &[Attempt],
    now_ms: i64,
    params: &RevisionParams,
) {
    let cutoff = now_ms - params.mastery_window_days * 24 * 60 * 60 * 1000;
    let mut correct_counts: HashMap<&str, usize> = HashMap::new();
    for a in window {
        if a.is_correct && a.timestamp >= cutoff {
            *correct_counts.entry(a.question_id.as_str()).or_default() += 1;
        }
    }

    let mastered: Vec<String> = correct_counts
        .into_iter()
        .filter(|(_, n)| *n >= params.mastery_required_correct)
        .map(|(q, _)| q.to_string())
        .collect();
    for question_id in &mastered {
        prune_mastered(buckets, question_id);
    }
}

/// Drops a mastered question from every bucket, removing buckets that
/// end up empty.
pub fn prune_mastered(buckets: &mut Vec<RevisionBucket>, question_id: &str) {
    for bucket in buckets.iter_mut() {
        bucket.questions.retain(|q| q != question_id);
    }
    buckets.retain(|b| !b.questions.is_empty());
}
