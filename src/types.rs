use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLabel {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl DifficultyLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "easy" => Self::Easy,
            "hard" => Self::Hard,
            _ => Self::Medium,
        }
    }

    /// Prior difficulty on the theta scale when no attempts exist yet.
    pub fn default_difficulty(&self) -> f64 {
        match self {
            Self::Easy => -1.0,
            Self::Medium => 0.0,
            Self::Hard => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoreTrend {
    Improving,
    #[default]
    Stable,
    Declining,
}

impl ScoreTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Improving => "improving",
            Self::Stable => "stable",
            Self::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    KnowledgeGap,
    ReasoningError,
    DataInterpretation,
    TimePressure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeGap => "knowledge_gap",
            Self::ReasoningError => "reasoning_error",
            Self::DataInterpretation => "data_interpretation",
            Self::TimePressure => "time_pressure",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketType {
    HighYieldLowAccuracy,
    IncorrectConfident,
    AlmostCorrect,
    SlowCorrect,
}

impl BucketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighYieldLowAccuracy => "high_yield_low_accuracy",
            Self::IncorrectConfident => "incorrect_confident",
            Self::AlmostCorrect => "almost_correct",
            Self::SlowCorrect => "slow_correct",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One timestamped answer to one question. Owned by the attempt store,
/// immutable once written; the engine only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub user_id: String,
    pub question_id: String,
    pub session_id: Option<String>,
    pub category: String,
    pub difficulty_label: DifficultyLabel,
    pub is_correct: bool,
    pub time_taken_ms: i64,
    pub confidence: Option<f64>,
    pub declared_error_kind: Option<ErrorKind>,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub timestamp: i64,
}

/// Catalog view of a question; read-only lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInfo {
    pub id: String,
    pub category: String,
    pub difficulty_label: DifficultyLabel,
    pub option_count: u32,
    pub stem: String,
    pub tags: Vec<String>,
}

/// Three-parameter logistic item model. Derived from attempt history,
/// reproducible at any time, never authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParameters {
    pub question_id: String,
    /// -3..+3, logit of the observed pass rate.
    pub difficulty: f64,
    /// 0..3, grows mildly with sample size.
    pub discrimination: f64,
    /// Floor probability, 1 / option count.
    pub guessing: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityEstimate {
    pub user_id: String,
    /// -3..+3 logit-scale ability.
    pub theta: f64,
    pub standard_error: f64,
    /// 0..1, grows with sample size.
    pub confidence: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub accuracy: f64,
    pub stability: f64,
    pub coverage: f64,
    pub speed: f64,
    pub consistency: f64,
}

impl ScoreComponents {
    pub fn total(&self) -> f64 {
        self.accuracy + self.stability + self.coverage + self.speed + self.consistency
    }
}

/// Write-once readiness snapshot. Appended to history; the cache holds
/// only the latest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessScore {
    pub user_id: String,
    pub overall_score: f64,
    pub components: ScoreComponents,
    pub interpretation: String,
    pub recommendation: String,
    pub is_cached: bool,
    pub computed_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityResult {
    pub stability_score: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub trend: ScoreTrend,
    pub series: Vec<f64>,
}

impl StabilityResult {
    /// Neutral default for users with too few completed mock exams.
    pub fn insufficient(series: Vec<f64>) -> Self {
        Self {
            stability_score: 50.0,
            variance: 0.0,
            std_dev: 0.0,
            trend: ScoreTrend::Stable,
            series,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCoverage {
    pub category: String,
    pub attempts: usize,
    pub coverage_percent: f64,
    pub covered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageResult {
    pub overall_coverage: f64,
    pub by_category: Vec<CategoryCoverage>,
    pub uncovered: Vec<String>,
    pub top_covered: Vec<CategoryCoverage>,
}

impl CoverageResult {
    pub fn empty() -> Self {
        Self {
            overall_coverage: 0.0,
            by_category: Vec::new(),
            uncovered: Vec::new(),
            top_covered: Vec::new(),
        }
    }
}

/// Classification of a single incorrect attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorClassification {
    pub user_id: String,
    pub question_id: String,
    pub error_kind: ErrorKind,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub reasoning: String,
}

/// Per-user aggregate of strengths, weaknesses and error patterns.
/// Upserted wholesale; fully recomputable, never partially patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveProfile {
    pub user_id: String,
    pub strength_categories: Vec<String>,
    pub weakness_categories: Vec<String>,
    pub error_pattern_counts: BTreeMap<String, usize>,
    pub recommendations: Vec<String>,
    pub last_updated: i64,
}

impl CognitiveProfile {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            strength_categories: Vec::new(),
            weakness_categories: Vec::new(),
            error_pattern_counts: BTreeMap::new(),
            recommendations: Vec::new(),
            last_updated: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryErrorStat {
    pub category: String,
    pub errors: usize,
}

/// Rolling-window view of where a learner's errors cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalPatternReport {
    pub user_id: String,
    pub window_days: i64,
    pub high_impact: Vec<CategoryErrorStat>,
    pub medium_impact: Vec<CategoryErrorStat>,
    pub low_impact: Vec<CategoryErrorStat>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
}

/// One document per (user, bucket type); replaced wholesale on each
/// regeneration so mastered questions never linger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionBucket {
    pub user_id: String,
    pub bucket_type: BucketType,
    pub questions: Vec<String>,
    pub priority: Priority,
    pub suggested_duration_minutes: u32,
    pub reason: String,
    pub generated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionDay {
    pub day: u32,
    pub bucket_type: BucketType,
    pub questions: Vec<String>,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSchedule {
    pub user_id: String,
    pub days_until_exam: u32,
    pub days: Vec<RevisionDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessHistoryPoint {
    pub computed_at: i64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: String,
    pub attempts: usize,
    pub correct: usize,
    pub accuracy: f64,
}

/// Full report payload for the upward API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub score: ReadinessScore,
    pub by_category: Vec<CategoryBreakdown>,
    pub trend: Vec<ReadinessHistoryPoint>,
    pub stability: StabilityResult,
    pub coverage: CoverageResult,
    pub recommendations: Vec<String>,
}

/// Outcome of one background aggregation pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReport {
    pub processed: usize,
    pub failed: usize,
}
