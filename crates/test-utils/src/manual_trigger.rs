//! A [`TriggerService`] that only fires when a test tells it to.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use gracecron::errors::{GracecronError, Result};
use gracecron::trigger::{Invocation, JobId, Schedule, StopSignal, TriggerService};

#[derive(Default)]
struct Inner {
    jobs: Vec<(JobId, Schedule, Invocation)>,
    started: bool,
    stopped: bool,
    next_id: u64,
}

/// Trigger service driven by hand.
///
/// - `add_job` still validates the schedule expression.
/// - `fire` / `fire_all` call invocations only between `start` and `stop`,
///   mirroring a real trigger service.
/// - `with_stop_delay` makes the stop signal resolve late, to exercise the
///   shutdown timeout path.
#[derive(Default)]
pub struct ManualTrigger {
    inner: Mutex<Inner>,
    stop_delay: Option<Duration>,
    stop_calls: AtomicUsize,
}

impl ManualTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stop_delay(delay: Duration) -> Self {
        Self {
            stop_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Call the invocation registered under `id`. Returns whether it fired.
    pub fn fire(&self, id: JobId) -> bool {
        let invocation = {
            let inner = self.lock();
            if !inner.started || inner.stopped {
                return false;
            }
            inner
                .jobs
                .iter()
                .find(|(job_id, _, _)| *job_id == id)
                .map(|(_, _, inv)| inv.clone())
        };

        match invocation {
            Some(inv) => {
                inv();
                true
            }
            None => false,
        }
    }

    /// Fire every registered job once. Returns how many fired.
    pub fn fire_all(&self) -> usize {
        let invocations: Vec<Invocation> = {
            let inner = self.lock();
            if !inner.started || inner.stopped {
                return 0;
            }
            inner.jobs.iter().map(|(_, _, inv)| inv.clone()).collect()
        };

        for inv in &invocations {
            inv();
        }
        invocations.len()
    }

    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn job_count(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn schedule_of(&self, id: JobId) -> Option<String> {
        self.lock()
            .jobs
            .iter()
            .find(|(job_id, _, _)| *job_id == id)
            .map(|(_, schedule, _)| schedule.as_str().to_string())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TriggerService for ManualTrigger {
    fn add_job(&self, schedule: &str, invocation: Invocation) -> Result<JobId> {
        let schedule = Schedule::parse(schedule)?;
        let mut inner = self.lock();
        if inner.stopped {
            return Err(GracecronError::ShuttingDown);
        }
        inner.next_id += 1;
        let id = JobId::new(inner.next_id);
        inner.jobs.push((id, schedule, invocation));
        Ok(id)
    }

    fn start(&self) {
        let mut inner = self.lock();
        if !inner.stopped {
            inner.started = true;
        }
    }

    fn stop(&self) -> StopSignal {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.lock().stopped = true;

        let delay = self.stop_delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        })
    }
}
