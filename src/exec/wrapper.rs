// src/exec/wrapper.rs

//! Execution wrapper: turns a raw [`Job`] into a tracked, deadline-bound,
//! panic-isolated execution.
//!
//! Cancellation is cooperative. When the deadline scope expires (per-job
//! timeout or scheduler shutdown) the job is *not* aborted: the wrapper keeps
//! waiting for it and only then records `Cancelled`. A wrapper can therefore
//! finalize its record long after a timed-out shutdown has returned.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::errors::GracecronError;
use crate::exec::Job;
use crate::store::{CancelCause, ExecutionError, ExecutionStore};
use crate::types::{JobStatus, OverlapPolicy};

#[derive(Clone)]
pub struct ExecutionWrapper {
    store: Arc<ExecutionStore>,
    shutdown: CancellationToken,
    overlap: OverlapPolicy,
}

impl ExecutionWrapper {
    pub fn new(
        store: Arc<ExecutionStore>,
        shutdown: CancellationToken,
        overlap: OverlapPolicy,
    ) -> Self {
        Self {
            store,
            shutdown,
            overlap,
        }
    }

    /// Run one execution of `job` under `name`, bounded by `timeout`.
    ///
    /// Returns the terminal status that was recorded, or `None` if the
    /// execution was not admitted (overlap policy or shutdown).
    pub async fn execute(
        &self,
        name: &str,
        job: Arc<dyn Job>,
        timeout: Duration,
    ) -> Option<JobStatus> {
        let scope = self.shutdown.child_token();

        let handle = match self.store.register(name, self.overlap) {
            Ok(handle) => handle,
            Err(GracecronError::AlreadyRunning(_)) => {
                debug!(job = %name, "previous execution still running; skipping");
                return None;
            }
            Err(err) => {
                warn!(job = %name, error = %err, "execution not admitted");
                return None;
            }
        };
        let execution_id = handle.id();
        info!(job = %name, %execution_id, ?timeout, "execution started");

        // Registration is visible before the job starts running.
        let mut work = tokio::spawn(async move { job.run().await });

        let (status, error) = tokio::select! {
            biased;
            joined = &mut work => settle(joined),
            cause = expiry(&scope, timeout) => {
                warn!(
                    job = %name,
                    %execution_id,
                    %cause,
                    "execution deadline reached; waiting for job to finish"
                );
                let _ = (&mut work).await;
                (JobStatus::Cancelled, Some(ExecutionError::DeadlineExceeded(cause)))
            }
        };

        match &error {
            None => info!(job = %name, %execution_id, %status, "execution finished"),
            Some(err) if err.is_fault() => {
                error!(job = %name, %execution_id, %status, error = %err, "execution failed")
            }
            Some(err) => warn!(job = %name, %execution_id, %status, error = %err, "execution cancelled"),
        }

        if !self.store.finalize(&handle, status, error) {
            debug!(job = %name, %execution_id, "final status not recorded");
        }
        Some(status)
    }
}

async fn expiry(scope: &CancellationToken, timeout: Duration) -> CancelCause {
    tokio::select! {
        _ = scope.cancelled() => CancelCause::Shutdown,
        _ = tokio::time::sleep(timeout) => CancelCause::Timeout(timeout),
    }
}

/// Map the outcome of the job task onto a terminal status.
fn settle(
    joined: std::result::Result<anyhow::Result<()>, JoinError>,
) -> (JobStatus, Option<ExecutionError>) {
    match joined {
        Ok(Ok(())) => (JobStatus::Completed, None),
        Ok(Err(err)) => (
            JobStatus::Failed,
            Some(ExecutionError::Fault(format!("{err:#}"))),
        ),
        Err(join_err) if join_err.is_panic() => (
            JobStatus::Failed,
            Some(ExecutionError::Panicked(panic_message(join_err.into_panic()))),
        ),
        // Only happens when the runtime itself is going away.
        Err(_) => (
            JobStatus::Cancelled,
            Some(ExecutionError::DeadlineExceeded(CancelCause::Shutdown)),
        ),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
