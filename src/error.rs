use thiserror::Error;

/// Engine fault taxonomy. Data sparsity never shows up here: thin or
/// missing history resolves to documented neutral defaults inside each
/// calculator. Only infrastructure faults reach the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(String),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

impl EngineError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}
