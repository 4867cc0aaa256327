// src/trigger/mod.rs

//! Trigger service seam.
//!
//! The scheduler does not compute firing times itself. It hands a wrapped
//! [`Invocation`] per job to a [`TriggerService`], which calls it whenever the
//! job's schedule says so, and which can be told to stop issuing invocations.
//!
//! [`CronTrigger`] is the production implementation. Tests can provide their
//! own (see `ManualTrigger` in the test-utils crate).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;

pub mod schedule;
pub mod timer;

pub use timer::CronTrigger;
pub use schedule::{Firing, Schedule};

/// Zero-argument callback issued on every tick of a job's schedule.
///
/// Must not block: the scheduler's invocations only spawn a task.
pub type Invocation = Arc<dyn Fn() + Send + Sync>;

/// Resolves once the trigger service will issue no further invocations.
pub type StopSignal = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Identifier handed out by [`TriggerService::add_job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something that fires invocations according to schedule expressions.
pub trait TriggerService: Send + Sync {
    /// Register `invocation` to be called on every tick of `schedule`.
    ///
    /// Fails with [`crate::errors::GracecronError::ScheduleParse`] when the
    /// expression is invalid.
    fn add_job(&self, schedule: &str, invocation: Invocation) -> Result<JobId>;

    /// Begin issuing invocations. Calling it again has no effect.
    fn start(&self);

    /// Stop issuing invocations and return a signal that resolves once no
    /// further invocation can happen.
    fn stop(&self) -> StopSignal;
}
