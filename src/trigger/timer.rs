// src/trigger/timer.rs

//! Timer-driven trigger service.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::{Invocation, JobId, Schedule, StopSignal, TriggerService};
use crate::errors::{GracecronError, Result};

struct Entry {
    id: JobId,
    schedule: Schedule,
    invocation: Invocation,
}

#[derive(Default)]
struct State {
    started: bool,
    /// Jobs added before `start`.
    pending: Vec<Entry>,
    /// One tick loop per job once started.
    tasks: Vec<JoinHandle<()>>,
}

/// Trigger service backed by one tokio timer loop per job.
///
/// `start` and `add_job` after `start` spawn tasks, so they must be called
/// from within a tokio runtime.
#[derive(Default)]
pub struct CronTrigger {
    state: Mutex<State>,
    stop: CancellationToken,
    next_id: AtomicU64,
}

impl CronTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TriggerService for CronTrigger {
    fn add_job(&self, schedule: &str, invocation: Invocation) -> Result<JobId> {
        let schedule = Schedule::parse(schedule)?;
        let id = JobId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);

        let mut state = self.lock();
        if self.stop.is_cancelled() {
            return Err(GracecronError::ShuttingDown);
        }

        debug!(job_id = %id, %schedule, "trigger registered");
        let entry = Entry {
            id,
            schedule,
            invocation,
        };
        if state.started {
            state.tasks.push(spawn_tick_loop(entry, self.stop.clone()));
        } else {
            state.pending.push(entry);
        }
        Ok(id)
    }

    fn start(&self) {
        let mut state = self.lock();
        if self.stop.is_cancelled() {
            warn!("trigger already stopped; ignoring start");
            return;
        }
        if state.started {
            return;
        }
        state.started = true;

        for entry in std::mem::take(&mut state.pending) {
            let handle = spawn_tick_loop(entry, self.stop.clone());
            state.tasks.push(handle);
        }
        info!(jobs = state.tasks.len(), "cron trigger started");
    }

    fn stop(&self) -> StopSignal {
        let tasks = {
            let mut state = self.lock();
            self.stop.cancel();
            std::mem::take(&mut state.tasks)
        };

        Box::pin(async move {
            for task in tasks {
                if let Err(err) = task.await {
                    warn!(error = %err, "tick loop ended abnormally");
                }
            }
            debug!("cron trigger stopped");
        })
    }
}

fn spawn_tick_loop(entry: Entry, stop: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(tick_loop(entry, stop))
}

async fn tick_loop(entry: Entry, stop: CancellationToken) {
    let Entry {
        id,
        schedule,
        invocation,
    } = entry;

    let mut last_slot = None;
    loop {
        let Some(firing) = schedule.next_firing(Utc::now(), last_slot) else {
            debug!(job_id = %id, %schedule, "schedule has no further firings");
            break;
        };

        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = tokio::time::sleep(firing.delay) => {
                trace!(job_id = %id, slot = ?firing.slot, "tick");
                last_slot = firing.slot;
                invocation();
            }
        }
    }
}
