// src/store/mod.rs

//! Execution record store.
//!
//! A concurrent mapping from job name to the latest [`ExecutionRecord`] for
//! that name, plus a completion signal per record. The "running view" is the
//! subset of records whose status is `Running`; a record leaves it the moment
//! it is finalized, but stays readable through [`ExecutionStore::get`] until
//! the next execution of the same name replaces it.
//!
//! All mutation happens under one internal lock that is never held across an
//! `.await`. Callers only ever receive clones of records.

pub mod record;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::{GracecronError, Result};
use crate::types::{JobStatus, OverlapPolicy};

pub use record::{CancelCause, ExecutionError, ExecutionId, ExecutionRecord};

struct Slot {
    record: ExecutionRecord,
    done: watch::Sender<bool>,
}

#[derive(Default)]
struct Slots {
    by_name: HashMap<String, Slot>,
    /// Set once shutdown has taken its snapshot; no new registrations after.
    closed: bool,
}

/// Proof of registration returned by [`ExecutionStore::register`].
///
/// Only the holder of a handle can finalize the record it names.
#[derive(Debug)]
pub struct ExecutionHandle {
    name: String,
    id: ExecutionId,
}

impl ExecutionHandle {
    pub fn id(&self) -> ExecutionId {
        self.id
    }
}

/// Completion signal of one execution.
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<bool>,
}

impl Completion {
    /// Resolve once the execution has been finalized.
    ///
    /// Also resolves if the record was replaced by a newer execution of the
    /// same name, since nothing tracks the old one after that.
    pub async fn wait(mut self) {
        let _ = self.rx.wait_for(|done| *done).await;
    }

    pub fn is_done(&self) -> bool {
        *self.rx.borrow()
    }
}

#[derive(Default)]
pub struct ExecutionStore {
    slots: RwLock<Slots>,
    next_id: AtomicU64,
}

impl ExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a `Running` record for `name` and return its handle.
    ///
    /// If a record for `name` is still running, `policy` decides: `Skip`
    /// rejects with [`GracecronError::AlreadyRunning`], `Replace` overwrites
    /// the record and logs a warning. Fails with
    /// [`GracecronError::ShuttingDown`] once the store has been closed.
    pub fn register(&self, name: &str, policy: OverlapPolicy) -> Result<ExecutionHandle> {
        let mut slots = self.write();

        if slots.closed {
            return Err(GracecronError::ShuttingDown);
        }

        if let Some(existing) = slots.by_name.get(name) {
            if existing.record.is_running() {
                match policy {
                    OverlapPolicy::Skip => {
                        return Err(GracecronError::AlreadyRunning(name.to_string()));
                    }
                    OverlapPolicy::Replace => {
                        warn!(
                            job = %name,
                            previous = %existing.record.id,
                            "replacing record of an execution that is still running; it is no longer tracked"
                        );
                    }
                }
            }
        }

        let id = ExecutionId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (done, _) = watch::channel(false);
        slots.by_name.insert(
            name.to_string(),
            Slot {
                record: ExecutionRecord::running(name, id),
                done,
            },
        );

        debug!(job = %name, execution_id = %id, "execution registered");

        Ok(ExecutionHandle {
            name: name.to_string(),
            id,
        })
    }

    /// Latest record for `name`, running or finished.
    pub fn get(&self, name: &str) -> Option<ExecutionRecord> {
        self.read()
            .by_name
            .get(name)
            .map(|slot| slot.record.clone())
    }

    /// Snapshot of all records currently `Running`.
    pub fn list_running(&self) -> Vec<ExecutionRecord> {
        self.read()
            .by_name
            .values()
            .filter(|slot| slot.record.is_running())
            .map(|slot| slot.record.clone())
            .collect()
    }

    /// Snapshot of running records together with their completion signals.
    pub fn running_completions(&self) -> Vec<(ExecutionRecord, Completion)> {
        self.read()
            .by_name
            .values()
            .filter(|slot| slot.record.is_running())
            .map(|slot| {
                (
                    slot.record.clone(),
                    Completion {
                        rx: slot.done.subscribe(),
                    },
                )
            })
            .collect()
    }

    /// Completion signal for the latest execution of `name`.
    pub fn completion(&self, name: &str) -> Option<Completion> {
        self.read().by_name.get(name).map(|slot| Completion {
            rx: slot.done.subscribe(),
        })
    }

    /// Move the record named by `handle` into a terminal state.
    ///
    /// Returns `false` and leaves the store untouched when the write is not
    /// applicable: `status` is not terminal, the record was replaced by a
    /// newer execution, or it is already terminal. Terminal records are
    /// immutable.
    pub fn finalize(
        &self,
        handle: &ExecutionHandle,
        status: JobStatus,
        error: Option<ExecutionError>,
    ) -> bool {
        if !status.is_terminal() {
            warn!(
                job = %handle.name,
                execution_id = %handle.id,
                %status,
                "refusing to finalize with a non-terminal status"
            );
            return false;
        }

        let mut slots = self.write();
        let Some(slot) = slots.by_name.get_mut(&handle.name) else {
            debug!(job = %handle.name, execution_id = %handle.id, "record vanished before finalize");
            return false;
        };

        if slot.record.id != handle.id {
            debug!(
                job = %handle.name,
                execution_id = %handle.id,
                current = %slot.record.id,
                "execution was superseded; dropping its final status"
            );
            return false;
        }

        if slot.record.status.is_terminal() {
            debug!(
                job = %handle.name,
                execution_id = %handle.id,
                recorded = %slot.record.status,
                attempted = %status,
                "record already terminal; dropping late write"
            );
            return false;
        }

        slot.record.status = status;
        slot.record.end_time = Some(Utc::now());
        slot.record.error = error;
        slot.done.send_replace(true);
        true
    }

    /// Refuse all further registrations.
    pub fn close(&self) {
        self.write().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// Number of names with a record.
    pub fn len(&self) -> usize {
        self.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn register_creates_running_record() {
        let store = ExecutionStore::new();
        let handle = store.register("backup", OverlapPolicy::Skip).unwrap();

        let record = store.get("backup").expect("record must exist");
        assert_eq!(record.id, handle.id());
        assert_eq!(record.status, JobStatus::Running);
        assert!(record.end_time.is_none());
        assert!(record.error.is_none());
        assert_eq!(store.list_running().len(), 1);
    }

    #[test]
    fn finalize_sets_end_time_and_leaves_running_view() {
        let store = ExecutionStore::new();
        let handle = store.register("backup", OverlapPolicy::Skip).unwrap();

        assert!(store.finalize(&handle, JobStatus::Completed, None));

        let record = store.get("backup").unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert!(record.end_time.is_some());
        assert!(store.list_running().is_empty());
        assert!(store.completion("backup").unwrap().is_done());
    }

    #[test]
    fn terminal_records_are_immutable() {
        let store = ExecutionStore::new();
        let handle = store.register("backup", OverlapPolicy::Skip).unwrap();

        let cancelled = ExecutionError::DeadlineExceeded(CancelCause::Shutdown);
        assert!(store.finalize(&handle, JobStatus::Cancelled, Some(cancelled.clone())));
        assert!(!store.finalize(&handle, JobStatus::Completed, None));

        let record = store.get("backup").unwrap();
        assert_eq!(record.status, JobStatus::Cancelled);
        assert_eq!(record.error, Some(cancelled));
    }

    #[test]
    fn non_terminal_finalize_is_rejected() {
        let store = ExecutionStore::new();
        let handle = store.register("backup", OverlapPolicy::Skip).unwrap();

        assert!(!store.finalize(&handle, JobStatus::Running, None));
        assert!(!store.finalize(&handle, JobStatus::Idle, None));
        assert!(store.get("backup").unwrap().is_running());
    }

    #[test]
    fn skip_policy_rejects_overlapping_registration() {
        let store = ExecutionStore::new();
        let first = store.register("backup", OverlapPolicy::Skip).unwrap();

        let err = store.register("backup", OverlapPolicy::Skip).unwrap_err();
        assert!(matches!(err, GracecronError::AlreadyRunning(name) if name == "backup"));
        assert_eq!(store.get("backup").unwrap().id, first.id());
    }

    #[test]
    fn replace_policy_overwrites_and_drops_superseded_finalize() {
        let store = ExecutionStore::new();
        let first = store.register("backup", OverlapPolicy::Replace).unwrap();
        let second = store.register("backup", OverlapPolicy::Replace).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(store.len(), 1);

        assert!(!store.finalize(&first, JobStatus::Completed, None));
        assert!(store.get("backup").unwrap().is_running());

        assert!(store.finalize(&second, JobStatus::Completed, None));
        assert_eq!(store.get("backup").unwrap().status, JobStatus::Completed);
    }

    #[test]
    fn finished_record_is_replaced_by_next_execution() {
        let store = ExecutionStore::new();
        let first = store.register("backup", OverlapPolicy::Skip).unwrap();
        store.finalize(
            &first,
            JobStatus::Failed,
            Some(ExecutionError::Fault("boom".into())),
        );

        let second = store.register("backup", OverlapPolicy::Skip).unwrap();
        let record = store.get("backup").unwrap();
        assert_eq!(record.id, second.id());
        assert!(record.is_running());
        assert!(record.error.is_none());
    }

    #[test]
    fn closed_store_rejects_registration() {
        let store = ExecutionStore::new();
        store.close();

        assert!(store.is_closed());
        assert!(matches!(
            store.register("backup", OverlapPolicy::Skip),
            Err(GracecronError::ShuttingDown)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn completion_resolves_after_finalize() {
        let store = std::sync::Arc::new(ExecutionStore::new());
        let handle = store.register("backup", OverlapPolicy::Skip).unwrap();
        let (_, completion) = store.running_completions().pop().unwrap();
        assert!(!completion.is_done());

        let finisher = {
            let store = store.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                store.finalize(&handle, JobStatus::Completed, None);
            })
        };

        tokio::time::timeout(Duration::from_secs(2), completion.wait())
            .await
            .expect("completion should fire");
        finisher.await.unwrap();
    }

    #[tokio::test]
    async fn completion_of_replaced_record_resolves() {
        let store = ExecutionStore::new();
        let _first = store.register("backup", OverlapPolicy::Replace).unwrap();
        let stale = store.completion("backup").unwrap();

        let _second = store.register("backup", OverlapPolicy::Replace).unwrap();

        tokio::time::timeout(Duration::from_secs(2), stale.wait())
            .await
            .expect("replaced completion should not block");
    }
}
