//! Batch recomputation across all known users.
//!
//! One bad user must never abort the batch: per-user failures are logged
//! and counted, and the next scheduled run self-heals. There is no retry.

use tracing::{info, warn};

use crate::engine::ReadinessEngine;
use crate::error::EngineError;
use crate::types::AggregationReport;

/// What one aggregation pass recomputes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationScope {
    /// Readiness scores only; the hourly job.
    Readiness,
    /// Readiness plus cognitive profiles and revision buckets over the
    /// given pattern window.
    Full { pattern_days: i64 },
}

/// Iterates every known user and recomputes the scoped documents,
/// bypassing the readiness cache. Returns how many users succeeded and
/// how many failed.
pub async fn run_aggregation(
    engine: &ReadinessEngine,
    scope: AggregationScope,
) -> Result<AggregationReport, EngineError> {
    let user_ids = engine.list_user_ids().await?;
    let mut report = AggregationReport::default();

    for user_id in &user_ids {
        match aggregate_user(engine, user_id, scope).await {
            Ok(()) => report.processed += 1,
            Err(err) => {
                report.failed += 1;
                warn!(user_id = %user_id, %err, "aggregation failed for user, continuing");
            }
        }
    }

    info!(
        processed = report.processed,
        failed = report.failed,
        ?scope,
        "aggregation pass finished"
    );
    Ok(report)
}

async fn aggregate_user(
    engine: &ReadinessEngine,
    user_id: &str,
    scope: AggregationScope,
) -> Result<(), EngineError> {
    engine.compute_readiness(user_id, false).await?;

    if let AggregationScope::Full { pattern_days } = scope {
        engine
            .analyze_clinical_patterns(user_id, Some(pattern_days))
            .await?;
        engine.generate_revision_buckets(user_id).await?;
    }

    Ok(())
}
