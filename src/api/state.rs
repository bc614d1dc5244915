use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    services::{CancellationToken, Pipeline},
};

/// One background job kind, of which at most one instance runs at a time
#[derive(Clone)]
pub struct JobSlot {
    name: &'static str,
    lock: Arc<Mutex<()>>,
}

impl JobSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Spawns `job` in the background unless an instance is already running
    ///
    /// The slot stays taken until the job finishes, whatever its outcome.
    pub fn start<F, Fut>(&self, job: F) -> AppResult<Uuid>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = AppResult<String>> + Send + 'static,
    {
        let guard = self
            .lock
            .clone()
            .try_lock_owned()
            .map_err(|_| AppError::AlreadyRunning(self.name.to_string()))?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("job", name = self.name, run_id = %run_id);

        tokio::spawn(
            async move {
                let _guard = guard;
                match job().await {
                    Ok(status) => tracing::info!(status = %status, "Job finished"),
                    Err(e) => tracing::error!(error = %e, "Job failed"),
                }
            }
            .instrument(span),
        );

        Ok(run_id)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub update_job: JobSlot,
    pub similarity_job: JobSlot,
    /// Cancelled on shutdown; running jobs stop at their next check
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            update_job: JobSlot::new("update_database"),
            similarity_job: JobSlot::new("find_similarities"),
            cancel: CancellationToken::new(),
        }
    }
}
