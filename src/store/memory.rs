use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::EngineError;
use crate::store::{AttemptFilter, AttemptStore, DerivedStore, QuestionCatalog};
use crate::types::{
    Attempt, CognitiveProfile, QuestionInfo, ReadinessScore, RevisionBucket,
};

/// In-memory implementation of all three store contracts. Backs the test
/// suite and embedded deployments; a database-backed implementation slots
/// in behind the same traits.
#[derive(Default)]
pub struct MemoryStore {
    attempts: RwLock<Vec<Attempt>>,
    questions: RwLock<HashMap<String, QuestionInfo>>,
    exam_scores: RwLock<HashMap<String, Vec<f64>>>,
    readiness: RwLock<Vec<ReadinessScore>>,
    profiles: RwLock<HashMap<String, CognitiveProfile>>,
    buckets: RwLock<HashMap<String, Vec<RevisionBucket>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_attempt(&self, attempt: Attempt) {
        self.attempts.write().await.push(attempt);
    }

    pub async fn add_attempts(&self, attempts: impl IntoIterator<Item = Attempt>) {
        self.attempts.write().await.extend(attempts);
    }

    pub async fn add_question(&self, question: QuestionInfo) {
        self.questions
            .write()
            .await
            .insert(question.id.clone(), question);
    }

    pub async fn add_mock_exam(&self, user_id: &str, percentage_score: f64) {
        self.exam_scores
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(percentage_score);
    }

    pub async fn readiness_count(&self, user_id: &str) -> usize {
        self.readiness
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn find(&self, filter: &AttemptFilter) -> Result<Vec<Attempt>, EngineError> {
        let attempts = self.attempts.read().await;
        let mut matched: Vec<Attempt> = attempts
            .iter()
            .filter(|a| {
                filter.user_id.as_deref().map_or(true, |u| a.user_id == u)
                    && filter
                        .question_id
                        .as_deref()
                        .map_or(true, |q| a.question_id == q)
                    && filter.category.as_deref().map_or(true, |c| a.category == c)
                    && filter.since_ms.map_or(true, |ts| a.timestamp >= ts)
            })
            .cloned()
            .collect();
        matched.sort_by_key(|a| std::cmp::Reverse(a.timestamp));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn list_user_ids(&self) -> Result<Vec<String>, EngineError> {
        let attempts = self.attempts.read().await;
        let mut ids: Vec<String> = attempts.iter().map(|a| a.user_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn mock_exam_scores(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<f64>, EngineError> {
        let scores = self.exam_scores.read().await;
        let series = scores.get(user_id).cloned().unwrap_or_default();
        let skip = series.len().saturating_sub(limit);
        Ok(series[skip..].to_vec())
    }
}

#[async_trait]
impl QuestionCatalog for MemoryStore {
    async fn get(&self, question_id: &str) -> Result<Option<QuestionInfo>, EngineError> {
        Ok(self.questions.read().await.get(question_id).cloned())
    }

    async fn categories(&self) -> Result<Vec<String>, EngineError> {
        let questions = self.questions.read().await;
        let mut categories: Vec<String> =
            questions.values().map(|q| q.category.clone()).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[async_trait]
impl DerivedStore for MemoryStore {
    async fn append_readiness(&self, score: &ReadinessScore) -> Result<(), EngineError> {
        self.readiness.write().await.push(score.clone());
        Ok(())
    }

    async fn readiness_history(
        &self,
        user_id: &str,
        since_ms: i64,
    ) -> Result<Vec<ReadinessScore>, EngineError> {
        let readiness = self.readiness.read().await;
        let mut history: Vec<ReadinessScore> = readiness
            .iter()
            .filter(|s| s.user_id == user_id && s.computed_at >= since_ms)
            .cloned()
            .collect();
        history.sort_by_key(|s| s.computed_at);
        Ok(history)
    }

    async fn upsert_profile(&self, profile: &CognitiveProfile) -> Result<(), EngineError> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn get_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<CognitiveProfile>, EngineError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn replace_buckets(
        &self,
        user_id: &str,
        buckets: &[RevisionBucket],
    ) -> Result<(), EngineError> {
        self.buckets
            .write()
            .await
            .insert(user_id.to_string(), buckets.to_vec());
        Ok(())
    }

    async fn get_buckets(&self, user_id: &str) -> Result<Vec<RevisionBucket>, EngineError> {
        Ok(self
            .buckets
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
