//! The readiness engine wires the estimators, the classifier and the
//! bucketer to the stores, caches hot reads, and appends history.
//!
//! Everything here is stateless per invocation: each call pulls what it
//! needs, computes, and replaces derived documents wholesale. Concurrent
//! recomputation for the same user is harmless, the last write wins.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::analytics::{
    calculate_coverage, calculate_stability, compute_components, overall_score, round2,
    ReadinessInputs,
};
use crate::cache::{keys, TtlCache};
use crate::cognitive::{self, ErrorContext};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::irt;
use crate::revision;
use crate::store::{AttemptFilter, AttemptStore, DerivedStore, QuestionCatalog};
use crate::types::{
    Attempt, CategoryBreakdown, ClinicalPatternReport, CognitiveProfile, CoverageResult,
    ErrorClassification, ReadinessHistoryPoint, ReadinessReport, ReadinessScore, RevisionBucket,
    RevisionSchedule,
};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

pub struct ReadinessEngine {
    config: EngineConfig,
    attempts: Arc<dyn AttemptStore>,
    catalog: Arc<dyn QuestionCatalog>,
    derived: Arc<dyn DerivedStore>,
    readiness_cache: TtlCache<ReadinessScore>,
}

impl ReadinessEngine {
    pub fn new(
        config: EngineConfig,
        attempts: Arc<dyn AttemptStore>,
        catalog: Arc<dyn QuestionCatalog>,
        derived: Arc<dyn DerivedStore>,
    ) -> Self {
        let ttl = Duration::from_secs(config.cache.readiness_ttl_secs);
        Self {
            config,
            attempts,
            catalog,
            derived,
            readiness_cache: TtlCache::new(ttl),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn list_user_ids(&self) -> Result<Vec<String>, EngineError> {
        self.attempts.list_user_ids().await
    }

    /// Composite readiness score. With `use_cache` a fresh snapshot is
    /// served unchanged except for `isCached: true`; otherwise the full
    /// pipeline runs, the snapshot is appended to history and re-cached.
    pub async fn compute_readiness(
        &self,
        user_id: &str,
        use_cache: bool,
    ) -> Result<ReadinessScore, EngineError> {
        let key = keys::readiness_key(user_id);
        if use_cache {
            if let Some(mut cached) = self.readiness_cache.get(&key).await {
                debug!(user_id, "readiness served from cache");
                cached.is_cached = true;
                return Ok(cached);
            }
        }

        let window = self
            .attempts
            .find(
                &AttemptFilter::for_user(user_id).limit(self.config.windows.attempt_window),
            )
            .await?;

        let raw_accuracy = if window.is_empty() {
            0.0
        } else {
            window.iter().filter(|a| a.is_correct).count() as f64 / window.len() as f64 * 100.0
        };

        let avg_discrimination = self.average_discrimination(&window).await?;

        let exam_scores = self
            .attempts
            .mock_exam_scores(user_id, self.config.stability.max_exams)
            .await?;
        let stability = calculate_stability(&exam_scores, &self.config.stability);

        let coverage = calculate_coverage(
            &attempts_per_category(&window),
            &self.catalog.categories().await?,
            &self.config.coverage,
        );

        let avg_time_ms = if window.is_empty() {
            None
        } else {
            Some(
                window.iter().map(|a| a.time_taken_ms as f64).sum::<f64>() / window.len() as f64,
            )
        };

        self.refresh_profile_from_coverage(user_id, &coverage)
            .await?;

        let trend = stability.trend;
        let inputs = ReadinessInputs {
            raw_accuracy,
            avg_discrimination,
            stability,
            coverage,
            avg_time_ms,
            recent_scores: exam_scores,
        };
        let components = compute_components(&inputs, &self.config);
        let overall = overall_score(&components);
        let recs = crate::analytics::readiness::recommendations(overall, trend);

        let score = ReadinessScore {
            user_id: user_id.to_string(),
            overall_score: overall,
            components,
            interpretation: crate::analytics::readiness::interpretation(overall).to_string(),
            recommendation: recs.first().cloned().unwrap_or_default(),
            is_cached: false,
            computed_at: now_ms(),
        };

        self.derived.append_readiness(&score).await?;
        self.readiness_cache.put(&key, score.clone()).await;
        info!(user_id, overall, "readiness recomputed");

        Ok(score)
    }

    pub async fn get_readiness(&self, user_id: &str) -> Result<ReadinessScore, EngineError> {
        self.compute_readiness(user_id, true).await
    }

    /// Full report: score, per-category accuracy, history trend, the raw
    /// stability and coverage results, and the ranked recommendations.
    pub async fn get_readiness_report(
        &self,
        user_id: &str,
    ) -> Result<ReadinessReport, EngineError> {
        let score = self.compute_readiness(user_id, true).await?;

        let window = self
            .attempts
            .find(
                &AttemptFilter::for_user(user_id).limit(self.config.windows.attempt_window),
            )
            .await?;

        let by_category = category_breakdown(&window);

        let since = now_ms() - self.config.windows.report_history_days * DAY_MS;
        let trend = self
            .derived
            .readiness_history(user_id, since)
            .await?
            .into_iter()
            .map(|s| ReadinessHistoryPoint {
                computed_at: s.computed_at,
                overall_score: s.overall_score,
            })
            .collect();

        let exam_scores = self
            .attempts
            .mock_exam_scores(user_id, self.config.stability.max_exams)
            .await?;
        let stability = calculate_stability(&exam_scores, &self.config.stability);
        let coverage = calculate_coverage(
            &attempts_per_category(&window),
            &self.catalog.categories().await?,
            &self.config.coverage,
        );
        let recommendations = crate::analytics::readiness::recommendations(
            score.overall_score,
            stability.trend,
        );

        Ok(ReadinessReport {
            score,
            by_category,
            trend,
            stability,
            coverage,
            recommendations,
        })
    }

    /// Classifies one incorrect attempt. Gathers the needed signals
    /// (prior history on the question, the stem) and runs the decision
    /// table; never fails on sparse data. A caller-supplied explanation
    /// of the user's reasoning is carried into the evidence.
    pub async fn analyze_error(
        &self,
        attempt: &Attempt,
        explanation: Option<String>,
    ) -> Result<ErrorClassification, EngineError> {
        let history = self
            .attempts
            .find(&AttemptFilter::for_question(
                &attempt.user_id,
                &attempt.question_id,
            ))
            .await?;
        let previously_correct = history
            .iter()
            .any(|a| a.is_correct && a.timestamp < attempt.timestamp);

        let stem = self
            .catalog
            .get(&attempt.question_id)
            .await?
            .map(|q| q.stem)
            .unwrap_or_default();

        let ctx = ErrorContext {
            user_id: attempt.user_id.clone(),
            question_id: attempt.question_id.clone(),
            user_answer: attempt.user_answer.clone().unwrap_or_default(),
            correct_answer: attempt.correct_answer.clone().unwrap_or_default(),
            time_taken_ms: attempt.time_taken_ms,
            explanation,
            previously_correct,
            stem,
        };

        Ok(cognitive::classify(&ctx, &self.config.error_rules))
    }

    /// Rolling-window pattern report. Also refreshes the stored
    /// cognitive profile as a side effect, the report and the profile
    /// are two views of the same pass.
    pub async fn analyze_clinical_patterns(
        &self,
        user_id: &str,
        window_days: Option<i64>,
    ) -> Result<ClinicalPatternReport, EngineError> {
        let days = window_days.unwrap_or(self.config.windows.pattern_days);
        let since = now_ms() - days * DAY_MS;
        let window = self
            .attempts
            .find(
                &AttemptFilter::for_user(user_id)
                    .since(since)
                    .limit(self.config.windows.attempt_window),
            )
            .await?;

        let stems = self.stems_for(&window).await?;
        let (report, kind_counts) =
            cognitive::mine_patterns(user_id, &window, &stems, days, &self.config.error_rules);

        let weaknesses: Vec<String> = report
            .high_impact
            .iter()
            .chain(report.medium_impact.iter())
            .map(|s| s.category.clone())
            .collect();
        let profile = CognitiveProfile {
            user_id: user_id.to_string(),
            strength_categories: report.strengths.clone(),
            weakness_categories: weaknesses,
            error_pattern_counts: kind_counts,
            recommendations: report.recommendations.clone(),
            last_updated: now_ms(),
        };
        self.derived.upsert_profile(&profile).await?;
        debug!(user_id, days, "cognitive profile refreshed");

        Ok(report)
    }

    pub async fn get_cognitive_profile(
        &self,
        user_id: &str,
    ) -> Result<CognitiveProfile, EngineError> {
        if let Some(profile) = self.derived.get_profile(user_id).await? {
            return Ok(profile);
        }
        self.analyze_clinical_patterns(user_id, None).await?;
        Ok(self
            .derived
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| CognitiveProfile::empty(user_id)))
    }

    /// Rebuilds the user's revision buckets from the recent window and
    /// replaces the stored set wholesale.
    pub async fn generate_revision_buckets(
        &self,
        user_id: &str,
    ) -> Result<Vec<RevisionBucket>, EngineError> {
        let window = self
            .attempts
            .find(&AttemptFilter::for_user(user_id).limit(self.config.revision.attempt_window))
            .await?;
        let mut buckets = revision::generate_buckets(user_id, &window, &self.config.revision);
        revision::prune_all_mastered(&mut buckets, &window, now_ms(), &self.config.revision);
        self.derived.replace_buckets(user_id, &buckets).await?;
        debug!(user_id, buckets = buckets.len(), "revision buckets rebuilt");
        Ok(buckets)
    }

    /// Day-by-day plan over the stored buckets. `days_until_exam` is
    /// clamped into [1, 365]; buckets are regenerated when none are
    /// stored yet.
    pub async fn get_revision_schedule(
        &self,
        user_id: &str,
        days_until_exam: u32,
    ) -> Result<RevisionSchedule, EngineError> {
        let days = days_until_exam.clamp(1, 365);
        let mut buckets = self.derived.get_buckets(user_id).await?;
        if buckets.is_empty() {
            buckets = self.generate_revision_buckets(user_id).await?;
        }
        Ok(revision::build_schedule(
            user_id,
            days,
            &buckets,
            &self.config.revision,
        ))
    }

    /// Retires a question from every bucket once it is mastered. Returns
    /// whether the prune happened.
    pub async fn mark_question_mastered(
        &self,
        user_id: &str,
        question_id: &str,
    ) -> Result<bool, EngineError> {
        let history = self
            .attempts
            .find(&AttemptFilter::for_question(user_id, question_id))
            .await?;
        if !revision::is_mastered(question_id, &history, now_ms(), &self.config.revision) {
            return Ok(false);
        }

        let mut buckets = self.derived.get_buckets(user_id).await?;
        revision::prune_mastered(&mut buckets, question_id);
        self.derived.replace_buckets(user_id, &buckets).await?;
        info!(user_id, question_id, "question mastered, pruned from buckets");
        Ok(true)
    }

    /// User ability on the theta scale, for adaptive question selection.
    pub async fn estimate_ability(
        &self,
        user_id: &str,
    ) -> Result<crate::types::AbilityEstimate, EngineError> {
        let window = self
            .attempts
            .find(&AttemptFilter::for_user(user_id).limit(self.config.windows.attempt_window))
            .await?;
        let items = self.item_parameters(&window).await?;
        Ok(irt::estimate_ability(
            user_id,
            &window,
            &items,
            &self.config.irt,
        ))
    }

    /// Drops expired readiness entries; called by the periodic sweeper.
    pub async fn sweep_caches(&self) -> usize {
        self.readiness_cache.sweep().await
    }

    /// Item parameters per distinct question in the window. Questions
    /// the catalog no longer knows are skipped, never estimated blind.
    async fn item_parameters(
        &self,
        window: &[Attempt],
    ) -> Result<HashMap<String, crate::types::ItemParameters>, EngineError> {
        let mut per_question: HashMap<&str, Vec<Attempt>> = HashMap::new();
        for attempt in window {
            per_question
                .entry(attempt.question_id.as_str())
                .or_default()
                .push(attempt.clone());
        }

        let mut items = HashMap::new();
        for (question_id, attempts) in per_question {
            let Some(info) = self.catalog.get(question_id).await? else {
                continue;
            };
            let params = irt::estimate_item_parameters(
                question_id,
                &attempts,
                info.difficulty_label,
                info.option_count,
                &self.config.irt,
            );
            items.insert(question_id.to_string(), params);
        }
        Ok(items)
    }

    async fn average_discrimination(
        &self,
        window: &[Attempt],
    ) -> Result<Option<f64>, EngineError> {
        let items = self.item_parameters(window).await?;
        if items.is_empty() {
            return Ok(None);
        }
        let sum: f64 = items.values().map(|p| p.discrimination).sum();
        Ok(Some(sum / items.len() as f64))
    }

    /// Folds the coverage picture into the stored profile on every
    /// recompute: fully covered categories count as strengths, untouched
    /// or under-practiced ones as weaknesses. Entries the error miner
    /// wrote stay unless coverage contradicts them.
    async fn refresh_profile_from_coverage(
        &self,
        user_id: &str,
        coverage: &CoverageResult,
    ) -> Result<(), EngineError> {
        let mut profile = self
            .derived
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| CognitiveProfile::empty(user_id));

        for entry in &coverage.by_category {
            if entry.covered {
                if !profile.strength_categories.contains(&entry.category) {
                    profile.strength_categories.push(entry.category.clone());
                }
                profile.weakness_categories.retain(|c| c != &entry.category);
            }
        }
        for category in &coverage.uncovered {
            if !profile.weakness_categories.contains(category) {
                profile.weakness_categories.push(category.clone());
            }
            profile.strength_categories.retain(|c| c != category);
        }

        profile.last_updated = now_ms();
        self.derived.upsert_profile(&profile).await
    }

    async fn stems_for(
        &self,
        window: &[Attempt],
    ) -> Result<HashMap<String, String>, EngineError> {
        let mut stems = HashMap::new();
        for attempt in window {
            if stems.contains_key(&attempt.question_id) {
                continue;
            }
            if let Some(info) = self.catalog.get(&attempt.question_id).await? {
                stems.insert(attempt.question_id.clone(), info.stem);
            }
        }
        Ok(stems)
    }
}

fn attempts_per_category(window: &[Attempt]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for attempt in window {
        *counts.entry(attempt.category.clone()).or_insert(0) += 1;
    }
    counts
}

fn category_breakdown(window: &[Attempt]) -> Vec<CategoryBreakdown> {
    let mut per_category: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for attempt in window {
        let entry = per_category.entry(attempt.category.as_str()).or_default();
        entry.0 += 1;
        if attempt.is_correct {
            entry.1 += 1;
        }
    }

    let mut breakdown: Vec<CategoryBreakdown> = per_category
        .into_iter()
        .map(|(category, (attempts, correct))| CategoryBreakdown {
            category: category.to_string(),
            attempts,
            correct,
            accuracy: round2(correct as f64 / attempts as f64 * 100.0),
        })
        .collect();
    breakdown.sort_by(|a, b| b.attempts.cmp(&a.attempts).then_with(|| a.category.cmp(&b.category)));
    breakdown
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
