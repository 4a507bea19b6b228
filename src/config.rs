use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrtParams {
    /// Discrimination used when a question has no attempt history.
    pub default_discrimination: f64,
    /// Discrimination ceiling as sample size grows.
    pub max_discrimination: f64,
    /// Proportions are clamped into (eps, 1-eps) before the logit
    /// transform so p = 0 or 1 never produces infinities.
    pub proportion_epsilon: f64,
    /// Standard error never shrinks below this floor.
    pub ability_se_floor: f64,
    /// Option count assumed when the catalog gives none.
    pub default_option_count: u32,
}

impl Default for IrtParams {
    fn default() -> Self {
        Self {
            default_discrimination: 1.2,
            max_discrimination: 2.5,
            proportion_epsilon: 0.01,
            ability_se_floor: 0.4,
            default_option_count: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityParams {
    /// Below this many completed mock exams the score is the neutral 50.
    pub min_exams: usize,
    /// Only the most recent exams feed the variance.
    pub max_exams: usize,
    /// Std dev treated as the practical maximum (maps to score 0).
    pub max_std_dev: f64,
    /// How many trailing scores form the "recent" mean for trend.
    pub trend_window: usize,
    /// Mean shift (percentage points) needed to call a trend.
    pub trend_threshold: f64,
}

impl Default for StabilityParams {
    fn default() -> Self {
        Self {
            min_exams: 3,
            max_exams: 20,
            max_std_dev: 40.0,
            trend_window: 5,
            trend_threshold: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageParams {
    /// Attempts needed before a category counts as fully practiced.
    pub min_questions_per_topic: usize,
    /// How many categories the top-covered list reports.
    pub top_covered: usize,
}

impl Default for CoverageParams {
    fn default() -> Self {
        Self {
            min_questions_per_topic: 5,
            top_covered: 5,
        }
    }
}

/// Component maxima of the composite readiness score. They must sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessWeights {
    pub accuracy: f64,
    pub stability: f64,
    pub coverage: f64,
    pub speed: f64,
    pub consistency: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        Self {
            accuracy: 40.0,
            stability: 20.0,
            coverage: 20.0,
            speed: 10.0,
            consistency: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedParams {
    /// Pace a well-prepared candidate sustains; faster earns full marks.
    pub ideal_time_per_question_ms: i64,
}

impl Default for SpeedParams {
    fn default() -> Self {
        Self {
            ideal_time_per_question_ms: 90_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRuleParams {
    /// A wrong answer slower than this on a previously-solved question
    /// reads as time pressure.
    pub time_pressure_threshold_ms: i64,
    /// Multiplier over the threshold at which time pressure becomes
    /// near-certain (confidence 0.95).
    pub very_slow_multiplier: f64,
    /// Fast wrong answers sharing vocabulary with the correct answer
    /// read as reasoning errors below this time.
    pub fast_answer_threshold_ms: i64,
    /// Numeric tokens in the stem before it counts as data-heavy.
    pub min_clinical_tokens: usize,
    /// Significant words shared between wrong and correct answers.
    pub min_shared_words: usize,
    /// Error counts per category marking high / medium impact tiers.
    pub high_impact_errors: usize,
    pub medium_impact_errors: usize,
    /// Correct answers per category before it counts as a strength.
    pub strength_min_correct: usize,
}

impl Default for ErrorRuleParams {
    fn default() -> Self {
        Self {
            time_pressure_threshold_ms: 120_000,
            very_slow_multiplier: 1.5,
            fast_answer_threshold_ms: 60_000,
            min_clinical_tokens: 3,
            min_shared_words: 2,
            high_impact_errors: 5,
            medium_impact_errors: 3,
            strength_min_correct: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionParams {
    /// Bucket generation looks at this many most recent attempts.
    pub attempt_window: usize,
    /// Cap on questions per bucket.
    pub bucket_limit: usize,
    /// Declared confidence at or above this marks a confident miss.
    pub confident_wrong_threshold: f64,
    /// Category volume and accuracy cutoffs for the high-yield bucket.
    pub high_yield_min_attempts: usize,
    pub high_yield_accuracy_cutoff: f64,
    /// Answer-length distance treated as a near miss.
    pub almost_correct_margin_chars: usize,
    /// Correct attempts inside the window that retire a question.
    pub mastery_required_correct: usize,
    pub mastery_window_days: i64,
    /// Correct-attempt time percentile above which "slow" starts.
    pub slow_percentile: f64,
    /// Schedule horizons for high and medium priority buckets.
    pub high_priority_horizon_days: u32,
    pub medium_priority_horizon_days: u32,
}

impl Default for RevisionParams {
    fn default() -> Self {
        Self {
            attempt_window: 300,
            bucket_limit: 100,
            confident_wrong_threshold: 0.7,
            high_yield_min_attempts: 10,
            high_yield_accuracy_cutoff: 0.7,
            almost_correct_margin_chars: 50,
            mastery_required_correct: 3,
            mastery_window_days: 7,
            slow_percentile: 0.9,
            high_priority_horizon_days: 14,
            medium_priority_horizon_days: 21,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowParams {
    /// Readiness and pattern analysis read at most this many attempts.
    pub attempt_window: usize,
    /// Days of readiness history shown in the report trend.
    pub report_history_days: i64,
    /// Default lookback for clinical pattern mining.
    pub pattern_days: i64,
}

impl Default for WindowParams {
    fn default() -> Self {
        Self {
            attempt_window: 300,
            report_history_days: 30,
            pattern_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheParams {
    /// Readiness scores younger than this are served unchanged.
    pub readiness_ttl_secs: u64,
}

impl Default for CacheParams {
    fn default() -> Self {
        Self {
            readiness_ttl_secs: 3600,
        }
    }
}

/// All policy knobs of the engine. The former magic numbers (300-attempt
/// window, 20-exam window, 90s ideal pace, 120s time-pressure cutoff) are
/// policy, not law, so they live here by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub irt: IrtParams,
    pub stability: StabilityParams,
    pub coverage: CoverageParams,
    pub weights: ReadinessWeights,
    pub speed: SpeedParams,
    pub error_rules: ErrorRuleParams,
    pub revision: RevisionParams,
    pub windows: WindowParams,
    pub cache: CacheParams,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ENGINE_READINESS_TTL_SECS") {
            if let Ok(secs) = val.parse() {
                config.cache.readiness_ttl_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("ENGINE_ATTEMPT_WINDOW") {
            if let Ok(n) = val.parse() {
                config.windows.attempt_window = n;
                config.revision.attempt_window = n;
            }
        }
        if let Ok(val) = std::env::var("ENGINE_IDEAL_TIME_MS") {
            if let Ok(ms) = val.parse() {
                config.speed.ideal_time_per_question_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("ENGINE_MIN_QUESTIONS_PER_TOPIC") {
            if let Ok(n) = val.parse() {
                config.coverage.min_questions_per_topic = n;
            }
        }

        config
    }
}
