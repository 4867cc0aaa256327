// src/engine/scheduler.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{GracecronError, Result};
use crate::exec::{ExecutionWrapper, Job};
use crate::store::{Completion, ExecutionRecord, ExecutionStore};
use crate::trigger::{Invocation, JobId, TriggerService};

use super::SchedulerConfig;
use super::coordinator::ShutdownCoordinator;

/// Caller-facing scheduler: submits jobs to a [`TriggerService`] through
/// tracked execution wrappers and exposes their lifecycle.
pub struct Scheduler<T: TriggerService> {
    config: SchedulerConfig,
    trigger: T,
    store: Arc<ExecutionStore>,
    coordinator: ShutdownCoordinator,
    wrapper: ExecutionWrapper,
    jobs: Mutex<HashMap<String, JobId>>,
    started: AtomicBool,
}

impl<T: TriggerService> fmt::Debug for Scheduler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("jobs", &self.lock_jobs().len())
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<T: TriggerService> Scheduler<T> {
    pub fn new(config: SchedulerConfig, trigger: T) -> Self {
        let store = Arc::new(ExecutionStore::new());
        let coordinator = ShutdownCoordinator::new(store.clone());
        let wrapper = ExecutionWrapper::new(store.clone(), coordinator.token(), config.overlap);

        Self {
            config,
            trigger,
            store,
            coordinator,
            wrapper,
            jobs: Mutex::new(HashMap::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn trigger(&self) -> &T {
        &self.trigger
    }

    /// Submit `job` under `name`, fired on `schedule`, with the configured
    /// per-execution timeout.
    pub fn submit<J: Job>(&self, schedule: &str, name: &str, job: J) -> Result<JobId> {
        self.submit_with_timeout(schedule, name, self.config.timeout, job)
    }

    /// Like [`Scheduler::submit`] with an explicit per-execution timeout.
    pub fn submit_with_timeout<J: Job>(
        &self,
        schedule: &str,
        name: &str,
        timeout: Duration,
        job: J,
    ) -> Result<JobId> {
        if self.coordinator.is_requested() {
            return Err(GracecronError::ShuttingDown);
        }

        let mut jobs = self.lock_jobs();
        if jobs.contains_key(name) {
            return Err(GracecronError::DuplicateJob(name.to_string()));
        }

        let invocation = self.invocation(name, Arc::new(job), timeout);
        let id = self.trigger.add_job(schedule, invocation)?;
        jobs.insert(name.to_string(), id);

        info!(job = %name, job_id = %id, %schedule, ?timeout, "job submitted");
        Ok(id)
    }

    /// Build the adapter the trigger service calls on every tick: each call
    /// spawns one tracked execution and returns immediately.
    fn invocation(&self, name: &str, job: Arc<dyn Job>, timeout: Duration) -> Invocation {
        let wrapper = self.wrapper.clone();
        let name = name.to_string();
        let shutdown = self.coordinator.token();

        Arc::new(move || {
            if shutdown.is_cancelled() {
                debug!(job = %name, "trigger fired during shutdown; ignoring");
                return;
            }
            let wrapper = wrapper.clone();
            let name = name.clone();
            let job = Arc::clone(&job);
            tokio::spawn(async move {
                wrapper.execute(&name, job, timeout).await;
            });
        })
    }

    /// Begin firing submitted jobs. Idempotent; ignored after shutdown.
    pub fn start(&self) {
        if self.coordinator.is_requested() {
            warn!("scheduler is shut down; ignoring start");
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.trigger.start();
        info!(jobs = self.lock_jobs().len(), "scheduler started");
    }

    /// Stop intake, cancel running executions cooperatively and wait up to
    /// `timeout` for them to finish. See [`ShutdownCoordinator::shutdown`].
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.coordinator.shutdown(&self.trigger, timeout).await
    }

    /// Latest execution record for `name`.
    pub fn status(&self, name: &str) -> Option<ExecutionRecord> {
        self.store.get(name)
    }

    /// Records of all executions currently running.
    pub fn list_running(&self) -> Vec<ExecutionRecord> {
        self.store.list_running()
    }

    /// Completion signal of the latest execution of `name`.
    pub fn completion(&self, name: &str) -> Option<Completion> {
        self.store.completion(name)
    }

    /// Names of submitted jobs, sorted.
    pub fn job_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock_jobs().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<String, JobId>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
