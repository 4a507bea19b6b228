pub mod aggregation;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::engine::ReadinessEngine;
use crate::error::EngineError;

pub use aggregation::{run_aggregation, AggregationScope};

static WORKER_LEADER: AtomicBool = AtomicBool::new(false);

pub fn is_worker_leader() -> bool {
    WORKER_LEADER.load(Ordering::Relaxed)
}

fn set_worker_leader(val: bool) {
    WORKER_LEADER.store(val, Ordering::Relaxed);
}

/// Owns the cron scheduler and the background aggregation cadence:
/// hourly readiness refresh, nightly full pass, weekly long-window pass,
/// plus a cache sweeper. Only the elected leader instance runs jobs so a
/// multi-replica deployment does not aggregate the same users N times.
pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    shutdown_tx: broadcast::Sender<()>,
    engine: Arc<ReadinessEngine>,
}

impl WorkerManager {
    pub async fn new(engine: Arc<ReadinessEngine>) -> Result<Self, EngineError> {
        let scheduler = JobScheduler::new().await?;
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            shutdown_tx,
            engine,
        })
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        let leader = std::env::var("WORKER_LEADER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if !leader {
            info!("WORKER_LEADER not set, skipping worker startup");
            return Ok(());
        }

        set_worker_leader(true);
        info!("Starting workers (leader mode)");

        let scheduler = self.scheduler.lock().await;

        // Hourly readiness refresh so on-demand reads mostly hit cache.
        {
            let schedule = std::env::var("READINESS_SCHEDULE")
                .unwrap_or_else(|_| "0 0 * * * *".to_string());
            let job = self.aggregation_job(&schedule, AggregationScope::Readiness)?;
            scheduler.add(job).await?;
            info!(schedule = %schedule, "Hourly readiness worker scheduled");
        }

        // Nightly full pass: readiness, profiles, revision buckets.
        {
            let schedule = std::env::var("FULL_AGGREGATION_SCHEDULE")
                .unwrap_or_else(|_| "0 0 3 * * *".to_string());
            let job =
                self.aggregation_job(&schedule, AggregationScope::Full { pattern_days: 30 })?;
            scheduler.add(job).await?;
            info!(schedule = %schedule, "Nightly full aggregation worker scheduled");
        }

        // Weekly long-window pass for slow-moving patterns.
        {
            let schedule = std::env::var("WEEKLY_AGGREGATION_SCHEDULE")
                .unwrap_or_else(|_| "0 0 4 * * 0".to_string());
            let job =
                self.aggregation_job(&schedule, AggregationScope::Full { pattern_days: 90 })?;
            scheduler.add(job).await?;
            info!(schedule = %schedule, "Weekly aggregation worker scheduled");
        }

        // Readiness cache sweep every 10 minutes.
        {
            let engine = Arc::clone(&self.engine);
            let shutdown_rx = self.shutdown_tx.subscribe();
            let job = Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
                let engine = Arc::clone(&engine);
                let mut rx = shutdown_rx.resubscribe();
                Box::pin(async move {
                    tokio::select! {
                        _ = rx.recv() => {},
                        _ = async {
                            let swept = engine.sweep_caches().await;
                            if swept > 0 {
                                info!(swept, "readiness cache sweep");
                            }
                        } => {}
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!("Cache sweep worker scheduled (every 10 minutes)");
        }

        scheduler.start().await?;
        info!("All workers started");

        Ok(())
    }

    fn aggregation_job(
        &self,
        schedule: &str,
        scope: AggregationScope,
    ) -> Result<Job, EngineError> {
        let engine = Arc::clone(&self.engine);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let engine = Arc::clone(&engine);
            let mut rx = shutdown_rx.resubscribe();
            Box::pin(async move {
                tokio::select! {
                    _ = rx.recv() => {},
                    result = run_aggregation(&engine, scope) => {
                        if let Err(e) = result {
                            error!(error = %e, "Aggregation worker error");
                        }
                    }
                }
            })
        })?;
        Ok(job)
    }

    pub async fn stop(&self) {
        if !is_worker_leader() {
            return;
        }

        info!("Stopping workers...");
        let _ = self.shutdown_tx.send(());

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }

        set_worker_leader(false);
        info!("Workers stopped");
    }
}
