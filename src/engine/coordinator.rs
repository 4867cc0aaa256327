// src/engine/coordinator.rs

//! Shutdown coordinator.
//!
//! Owns the scheduler-wide cancellation token and turns "please stop" into
//! one bounded sequence: cancel every outstanding execution cooperatively,
//! stop the trigger service, then wait for everything that was running with a
//! hard ceiling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{GracecronError, Result};
use crate::store::ExecutionStore;
use crate::trigger::TriggerService;

pub struct ShutdownCoordinator {
    token: CancellationToken,
    store: Arc<ExecutionStore>,
    requested: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new(store: Arc<ExecutionStore>) -> Self {
        Self {
            token: CancellationToken::new(),
            store,
            requested: AtomicBool::new(false),
        }
    }

    /// The shared token every execution wrapper is derived from.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Run the shutdown sequence once.
    ///
    /// Returns `Ok(())` if the trigger service stopped and every execution
    /// that was running finished within `timeout`, otherwise
    /// [`GracecronError::ShutdownTimeout`]. Executions are never aborted, so
    /// they keep running in the background after a timeout.
    ///
    /// Only the first call does anything; later calls return `Ok(())`
    /// immediately.
    pub async fn shutdown(&self, trigger: &dyn TriggerService, timeout: Duration) -> Result<()> {
        if self.requested.swap(true, Ordering::SeqCst) {
            debug!("shutdown already requested; ignoring");
            return Ok(());
        }

        info!(?timeout, "shutdown requested");
        self.token.cancel();
        let stopped = trigger.stop();

        // Nothing can register after this, so the snapshot is complete.
        self.store.close();
        let running = self.store.running_completions();
        let names: Vec<String> = running.iter().map(|(r, _)| r.name.clone()).collect();
        info!(running = names.len(), jobs = ?names, "waiting for running executions");

        let drain = async move {
            tokio::join!(
                join_all(running.into_iter().map(|(_, done)| done.wait())),
                stopped
            );
        };

        match tokio::time::timeout(timeout, drain).await {
            Ok(()) => {
                info!("shutdown complete");
                Ok(())
            }
            Err(_) => {
                let pending: Vec<String> = names
                    .into_iter()
                    .filter(|name| self.store.get(name).is_some_and(|r| r.is_running()))
                    .collect();
                warn!(?timeout, ?pending, "shutdown timed out; executions continue in background");
                Err(GracecronError::ShutdownTimeout { timeout, pending })
            }
        }
    }
}
