// src/store/record.rs

//! Execution record and the per-execution error taxonomy.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::JobStatus;

/// Identifies one firing of a job, as opposed to the job definition itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionId(u64);

impl ExecutionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a deadline-bound execution scope expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The per-execution timeout elapsed.
    Timeout(Duration),
    /// The scheduler-wide shutdown token fired.
    Shutdown,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Timeout(d) => write!(f, "timed out after {d:?}"),
            CancelCause::Shutdown => f.write_str("scheduler shutdown"),
        }
    }
}

/// Error captured on a `Failed` or `Cancelled` record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The job returned an error.
    #[error("job failed: {0}")]
    Fault(String),

    /// The job panicked; the message is recovered from the panic payload.
    #[error("job panicked: {0}")]
    Panicked(String),

    /// The execution scope expired before the job finished.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(CancelCause),
}

impl ExecutionError {
    pub fn is_fault(&self) -> bool {
        matches!(self, ExecutionError::Fault(_) | ExecutionError::Panicked(_))
    }
}

/// Tracked lifecycle state of one execution.
///
/// `end_time` is `None` exactly while `status` is `Running`, and `error` is
/// present only for `Failed` and `Cancelled`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub name: String,
    pub id: ExecutionId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: JobStatus,
    pub error: Option<ExecutionError>,
}

impl ExecutionRecord {
    pub(crate) fn running(name: &str, id: ExecutionId) -> Self {
        Self {
            name: name.to_string(),
            id,
            start_time: Utc::now(),
            end_time: None,
            status: JobStatus::Running,
            error: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Wall-clock time between start and end, once finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}
