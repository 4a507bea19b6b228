pub mod memory;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::types::{
    Attempt, CognitiveProfile, QuestionInfo, ReadinessScore, RevisionBucket,
};

pub use memory::MemoryStore;

/// Query against the append-only attempt log. Results come back newest
/// first; `limit` bounds the scan so worst-case latency stays tied to a
/// single user's capped history.
#[derive(Debug, Clone, Default)]
pub struct AttemptFilter {
    pub user_id: Option<String>,
    pub question_id: Option<String>,
    pub category: Option<String>,
    pub since_ms: Option<i64>,
    pub limit: Option<usize>,
}

impl AttemptFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_question(user_id: &str, question_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            question_id: Some(question_id.to_string()),
            ..Default::default()
        }
    }

    pub fn since(mut self, since_ms: i64) -> Self {
        self.since_ms = Some(since_ms);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Read-only window onto the attempt log and completed mock-exam scores.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn find(&self, filter: &AttemptFilter) -> Result<Vec<Attempt>, EngineError>;

    async fn list_user_ids(&self) -> Result<Vec<String>, EngineError>;

    /// Last `limit` completed mock-exam percentage scores, oldest first.
    async fn mock_exam_scores(&self, user_id: &str, limit: usize)
        -> Result<Vec<f64>, EngineError>;
}

/// Read-only question lookup used to label attempts and to detect
/// data-heavy stems.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    async fn get(&self, question_id: &str) -> Result<Option<QuestionInfo>, EngineError>;

    async fn categories(&self) -> Result<Vec<String>, EngineError>;
}

/// Store for engine-derived documents. Everything here is replaced
/// wholesale (insert-append or upsert-by-key); no multi-document
/// transaction is ever required, which is what makes concurrent
/// recomputation safe.
#[async_trait]
pub trait DerivedStore: Send + Sync {
    async fn append_readiness(&self, score: &ReadinessScore) -> Result<(), EngineError>;

    /// Readiness snapshots newer than `since_ms`, oldest first.
    async fn readiness_history(
        &self,
        user_id: &str,
        since_ms: i64,
    ) -> Result<Vec<ReadinessScore>, EngineError>;

    async fn upsert_profile(&self, profile: &CognitiveProfile) -> Result<(), EngineError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<CognitiveProfile>, EngineError>;

    /// Replaces the user's full bucket set.
    async fn replace_buckets(
        &self,
        user_id: &str,
        buckets: &[RevisionBucket],
    ) -> Result<(), EngineError>;

    async fn get_buckets(&self, user_id: &str) -> Result<Vec<RevisionBucket>, EngineError>;
}
