//! End-to-end tests over the engine with the in-memory store: cache
//! behavior, composite scoring on known fixtures, bucket preconditions,
//! mastery pruning and batch aggregation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use examready_engine::error::EngineError;
use examready_engine::store::{AttemptFilter, AttemptStore, DerivedStore, MemoryStore};
use examready_engine::types::{Attempt, BucketType, DifficultyLabel, Priority, QuestionInfo};
use examready_engine::workers::{run_aggregation, AggregationScope};
use examready_engine::{EngineConfig, ReadinessEngine};

fn attempt(user: &str, question: &str, category: &str, correct: bool, time_ms: i64) -> Attempt {
    Attempt {
        user_id: user.to_string(),
        question_id: question.to_string(),
        session_id: None,
        category: category.to_string(),
        difficulty_label: DifficultyLabel::Medium,
        is_correct: correct,
        time_taken_ms: time_ms,
        confidence: None,
        declared_error_kind: None,
        user_answer: None,
        correct_answer: None,
        timestamp: Utc::now().timestamp_millis(),
    }
}

fn question(id: &str, category: &str) -> QuestionInfo {
    QuestionInfo {
        id: id.to_string(),
        category: category.to_string(),
        difficulty_label: DifficultyLabel::Medium,
        option_count: 4,
        stem: "A 54-year-old presents with new chest pain.".to_string(),
        tags: Vec::new(),
    }
}

fn engine_over(store: &Arc<MemoryStore>) -> ReadinessEngine {
    ReadinessEngine::new(
        EngineConfig::default(),
        store.clone(),
        store.clone(),
        store.clone(),
    )
}

#[tokio::test]
async fn cached_readiness_is_identical_and_flagged() {
    let store = Arc::new(MemoryStore::new());
    for i in 1..=5 {
        store.add_question(question(&format!("q{i}"), "cardiology")).await;
        store
            .add_attempt(attempt("u1", &format!("q{i}"), "cardiology", i % 2 == 1, 60_000))
            .await;
    }
    let engine = engine_over(&store);

    let first = engine.compute_readiness("u1", true).await.unwrap();
    assert!(!first.is_cached);

    let second = engine.compute_readiness("u1", true).await.unwrap();
    assert!(second.is_cached);
    assert_eq!(second.overall_score, first.overall_score);
    assert_eq!(second.components, first.components);
    assert_eq!(second.computed_at, first.computed_at);

    // Only the real computation appended to history.
    assert_eq!(store.readiness_count("u1").await, 1);
}

#[tokio::test]
async fn bypassing_the_cache_recomputes_and_appends() {
    let store = Arc::new(MemoryStore::new());
    store.add_question(question("q1", "cardiology")).await;
    store.add_attempt(attempt("u1", "q1", "cardiology", true, 60_000)).await;
    let engine = engine_over(&store);

    engine.compute_readiness("u1", true).await.unwrap();
    engine.compute_readiness("u1", false).await.unwrap();
    assert_eq!(store.readiness_count("u1").await, 2);
}

#[tokio::test]
async fn composite_scores_a_known_fixture() {
    let store = Arc::new(MemoryStore::new());
    // Five single-attempt questions in one fully-practiced category:
    // 3/5 correct at exactly the ideal pace, no mock exams.
    let outcomes = [true, true, false, true, false];
    for (i, &correct) in outcomes.iter().enumerate() {
        let id = format!("q{i}");
        store.add_question(question(&id, "cardiology")).await;
        store.add_attempt(attempt("u1", &id, "cardiology", correct, 60_000)).await;
    }
    let engine = engine_over(&store);

    let score = engine.compute_readiness("u1", false).await.unwrap();
    let c = score.components;

    // Single-attempt discrimination grows off the 1.2 default.
    let disc = (1.2 + (1.0_f64 + 1.0 / 50.0).ln() * 0.3).min(2.5);
    let expected_accuracy =
        ((60.0 * (1.0 + (disc - 1.0) * 0.1) / 100.0 * 40.0) * 100.0).round() / 100.0;
    assert!((c.accuracy - expected_accuracy).abs() < 1e-9);

    // No mock exams: neutral stability (50/100 of 20) and half-weight
    // consistency. One fully-covered category out of one. Ideal pace.
    assert_eq!(c.stability, 10.0);
    assert_eq!(c.coverage, 20.0);
    assert_eq!(c.speed, 10.0);
    assert_eq!(c.consistency, 5.0);

    let sum = c.accuracy + c.stability + c.coverage + c.speed + c.consistency;
    assert!((score.overall_score - (sum * 100.0).round() / 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn a_flawless_candidate_scores_one_hundred() {
    let store = Arc::new(MemoryStore::new());
    let categories = ["cardiology", "renal", "pharm", "derm", "neuro"];
    for category in categories {
        for i in 0..5 {
            let id = format!("{category}-{i}");
            store.add_question(question(&id, category)).await;
            store.add_attempt(attempt("u1", &id, category, true, 30_000)).await;
        }
    }
    for _ in 0..4 {
        store.add_mock_exam("u1", 90.0).await;
    }
    let engine = engine_over(&store);

    let score = engine.compute_readiness("u1", false).await.unwrap();
    assert_eq!(score.overall_score, 100.0);
    assert_eq!(score.components.accuracy, 40.0);
    assert_eq!(score.components.stability, 20.0);
    assert_eq!(score.components.consistency, 10.0);
}

#[tokio::test]
async fn no_attempts_yields_neutral_floor_not_an_error() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let score = engine.compute_readiness("ghost", false).await.unwrap();
    assert_eq!(score.components.accuracy, 0.0);
    assert_eq!(score.components.stability, 10.0);
    assert_eq!(score.components.coverage, 0.0);
    // Neutral half-weights with no timing or exam data at all.
    assert_eq!(score.components.speed, 5.0);
    assert_eq!(score.components.consistency, 5.0);
}

#[tokio::test]
async fn report_carries_breakdown_and_history_trend() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..6 {
        let category = if i < 4 { "cardiology" } else { "renal" };
        let id = format!("q{i}");
        store.add_question(question(&id, category)).await;
        store.add_attempt(attempt("u1", &id, category, i % 2 == 0, 45_000)).await;
    }
    let engine = engine_over(&store);

    engine.compute_readiness("u1", false).await.unwrap();
    engine.compute_readiness("u1", false).await.unwrap();
    let report = engine.get_readiness_report("u1").await.unwrap();

    assert_eq!(report.trend.len(), 2);
    assert_eq!(report.by_category.len(), 2);
    // Sorted by attempt volume.
    assert_eq!(report.by_category[0].category, "cardiology");
    assert_eq!(report.by_category[0].attempts, 4);
    assert!(!report.recommendations.is_empty());
}

#[tokio::test]
async fn high_yield_bucket_needs_ten_attempts_in_category() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..9 {
        store.add_attempt(attempt("u1", &format!("q{i}"), "pharm", false, 45_000)).await;
    }
    let engine = engine_over(&store);

    let buckets = engine.generate_revision_buckets("u1").await.unwrap();
    assert!(buckets
        .iter()
        .all(|b| b.bucket_type != BucketType::HighYieldLowAccuracy));

    store.add_attempt(attempt("u1", "q9", "pharm", false, 45_000)).await;
    let buckets = engine.generate_revision_buckets("u1").await.unwrap();
    let bucket = buckets
        .iter()
        .find(|b| b.bucket_type == BucketType::HighYieldLowAccuracy)
        .expect("high-yield bucket after the 10th attempt");
    assert_eq!(bucket.priority, Priority::High);
    assert_eq!(bucket.questions.len(), 10);
}

#[tokio::test]
async fn schedule_places_stored_buckets_on_fixed_days() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..10 {
        store.add_attempt(attempt("u1", &format!("q{i}"), "pharm", false, 45_000)).await;
    }
    let engine = engine_over(&store);

    // No stored buckets yet: the schedule call generates them.
    let schedule = engine.get_revision_schedule("u1", 10).await.unwrap();
    assert_eq!(schedule.days_until_exam, 10);
    let days: Vec<u32> = schedule.days.iter().map(|d| d.day).collect();
    assert_eq!(days, vec![1, 4, 7, 10]);

    // Out-of-range horizon clamps instead of erroring.
    let schedule = engine.get_revision_schedule("u1", 0).await.unwrap();
    assert_eq!(schedule.days_until_exam, 1);
}

#[tokio::test]
async fn mastery_prunes_on_the_third_recent_correct_and_not_before() {
    let store = Arc::new(MemoryStore::new());
    let mut wrong = attempt("u1", "qm", "pharm", false, 45_000);
    wrong.confidence = Some(0.9);
    wrong.timestamp = Utc::now().timestamp_millis() - 60_000;
    store.add_attempt(wrong).await;
    let engine = engine_over(&store);

    let buckets = engine.generate_revision_buckets("u1").await.unwrap();
    assert!(buckets
        .iter()
        .any(|b| b.bucket_type == BucketType::IncorrectConfident
            && b.questions.contains(&"qm".to_string())));

    for _ in 0..2 {
        store.add_attempt(attempt("u1", "qm", "pharm", true, 40_000)).await;
    }
    assert!(!engine.mark_question_mastered("u1", "qm").await.unwrap());
    let remaining: Vec<_> = engine.get_revision_schedule("u1", 5).await.unwrap().days;
    assert!(remaining.iter().any(|d| d.questions.contains(&"qm".to_string())));

    store.add_attempt(attempt("u1", "qm", "pharm", true, 40_000)).await;
    assert!(engine.mark_question_mastered("u1", "qm").await.unwrap());
    let schedule = engine.get_revision_schedule("u1", 5).await.unwrap();
    assert!(schedule
        .days
        .iter()
        .all(|d| !d.questions.contains(&"qm".to_string())));
}

#[tokio::test]
async fn recompute_refreshes_profile_from_coverage() {
    let store = Arc::new(MemoryStore::new());
    // Cardiology fully practiced; renal in the catalog but untouched.
    for i in 0..5 {
        let id = format!("q{i}");
        store.add_question(question(&id, "cardiology")).await;
        store.add_attempt(attempt("u1", &id, "cardiology", true, 60_000)).await;
    }
    store.add_question(question("r1", "renal")).await;
    let engine = engine_over(&store);

    engine.compute_readiness("u1", false).await.unwrap();

    let profile = store
        .get_profile("u1")
        .await
        .unwrap()
        .expect("profile written on recompute");
    assert!(profile
        .strength_categories
        .contains(&"cardiology".to_string()));
    assert!(profile.weakness_categories.contains(&"renal".to_string()));
}

#[tokio::test]
async fn coverage_refresh_preserves_mined_error_counts() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..5 {
        let id = format!("q{i}");
        store.add_question(question(&id, "cardiology")).await;
        store.add_attempt(attempt("u1", &id, "cardiology", false, 45_000)).await;
    }
    let engine = engine_over(&store);

    engine.analyze_clinical_patterns("u1", None).await.unwrap();
    engine.compute_readiness("u1", false).await.unwrap();

    let profile = store.get_profile("u1").await.unwrap().unwrap();
    // The miner's per-kind counts survive the coverage refresh, and the
    // fully-covered category is now a strength instead of a weakness.
    assert!(!profile.error_pattern_counts.is_empty());
    assert!(profile
        .strength_categories
        .contains(&"cardiology".to_string()));
    assert!(!profile
        .weakness_categories
        .contains(&"cardiology".to_string()));
}

#[tokio::test]
async fn profile_reflects_mined_patterns() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..6 {
        let id = format!("q{i}");
        store.add_question(question(&id, "cardiology")).await;
        store.add_attempt(attempt("u1", &id, "cardiology", false, 45_000)).await;
    }
    for i in 6..12 {
        let id = format!("q{i}");
        store.add_question(question(&id, "pharm")).await;
        store.add_attempt(attempt("u1", &id, "pharm", true, 45_000)).await;
    }
    let engine = engine_over(&store);

    let report = engine.analyze_clinical_patterns("u1", None).await.unwrap();
    assert_eq!(report.high_impact[0].category, "cardiology");
    assert_eq!(report.strengths, vec!["pharm".to_string()]);

    let profile = engine.get_cognitive_profile("u1").await.unwrap();
    assert_eq!(profile.weakness_categories, vec!["cardiology".to_string()]);
    assert_eq!(profile.strength_categories, vec!["pharm".to_string()]);
    assert!(!profile.error_pattern_counts.is_empty());
}

#[tokio::test]
async fn analyze_error_uses_question_history_and_stem() {
    let store = Arc::new(MemoryStore::new());
    store.add_question(question("q1", "cardiology")).await;

    let mut earlier = attempt("u1", "q1", "cardiology", true, 50_000);
    earlier.timestamp -= 86_400_000;
    store.add_attempt(earlier).await;

    let mut miss = attempt("u1", "q1", "cardiology", false, 130_000);
    miss.user_answer = Some("nitrates".to_string());
    miss.correct_answer = Some("aspirin".to_string());
    store.add_attempt(miss.clone()).await;

    let engine = engine_over(&store);
    let classification = engine
        .analyze_error(&miss, Some("ran out of time reading the vignette".to_string()))
        .await
        .unwrap();
    assert_eq!(classification.error_kind.as_str(), "time_pressure");
    assert!(classification.confidence >= 0.7);
    // The caller's explanation is carried into the evidence trail.
    assert!(classification
        .evidence
        .iter()
        .any(|e| e.contains("ran out of time")));
}

/// Attempt store that fails for one user, to exercise partial-failure
/// isolation in the batch job.
struct FlakyAttempts {
    inner: Arc<MemoryStore>,
    poisoned_user: String,
}

#[async_trait]
impl AttemptStore for FlakyAttempts {
    async fn find(&self, filter: &AttemptFilter) -> Result<Vec<Attempt>, EngineError> {
        if filter.user_id.as_deref() == Some(self.poisoned_user.as_str()) {
            return Err(EngineError::store("simulated read failure"));
        }
        self.inner.find(filter).await
    }

    async fn list_user_ids(&self) -> Result<Vec<String>, EngineError> {
        self.inner.list_user_ids().await
    }

    async fn mock_exam_scores(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<f64>, EngineError> {
        self.inner.mock_exam_scores(user_id, limit).await
    }
}

#[tokio::test]
async fn aggregation_isolates_per_user_failures() {
    let store = Arc::new(MemoryStore::new());
    store.add_question(question("q1", "cardiology")).await;
    store.add_attempt(attempt("good", "q1", "cardiology", true, 60_000)).await;
    store.add_attempt(attempt("bad", "q1", "cardiology", true, 60_000)).await;

    let flaky = Arc::new(FlakyAttempts {
        inner: store.clone(),
        poisoned_user: "bad".to_string(),
    });
    let engine = ReadinessEngine::new(
        EngineConfig::default(),
        flaky,
        store.clone(),
        store.clone(),
    );

    let report = run_aggregation(&engine, AggregationScope::Full { pattern_days: 30 })
        .await
        .unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 1);

    // The good user's documents landed despite the failure.
    assert_eq!(store.readiness_count("good").await, 1);
    assert_eq!(store.readiness_count("bad").await, 0);
}

#[tokio::test]
async fn readiness_serializes_camel_case() {
    let store = Arc::new(MemoryStore::new());
    store.add_question(question("q1", "cardiology")).await;
    store.add_attempt(attempt("u1", "q1", "cardiology", true, 60_000)).await;
    let engine = engine_over(&store);

    let score = engine.compute_readiness("u1", false).await.unwrap();
    let json = serde_json::to_value(&score).unwrap();
    assert!(json.get("overallScore").is_some());
    assert!(json.get("isCached").is_some());
    assert!(json["components"].get("consistency").is_some());
}
