// src/engine/mod.rs

//! Lifecycle engine.
//!
//! - [`scheduler`] is the caller-facing [`Scheduler`]: `submit`, `start`,
//!   `shutdown`, `status`, `list_running`.
//! - [`coordinator`] implements the bounded, cooperative shutdown sequence.
//!
//! Both share one [`crate::store::ExecutionStore`] and one cancellation token
//! created by the scheduler; nothing here is global state.

use std::time::Duration;

use crate::types::OverlapPolicy;

pub mod coordinator;
pub mod scheduler;

pub use coordinator::ShutdownCoordinator;
pub use scheduler::Scheduler;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options recognised by the [`Scheduler`].
///
/// Diagnostics go through `tracing`; the sink is whatever subscriber the
/// process installed (see [`crate::logging`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Deadline of a single execution, unless overridden per job.
    pub timeout: Duration,
    /// Ceiling used by callers that shut down with the configured budget.
    pub shutdown_timeout: Duration,
    /// What to do when a job fires while it is still running.
    pub overlap: OverlapPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            shutdown_timeout: DEFAULT_TIMEOUT,
            overlap: OverlapPolicy::default(),
        }
    }
}
