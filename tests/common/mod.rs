#![allow(dead_code)]

use std::time::Duration;

use gracecron::engine::{Scheduler, SchedulerConfig};
use gracecron::store::ExecutionRecord;
use gracecron::trigger::TriggerService;
use gracecron::types::{JobStatus, OverlapPolicy};

pub use gracecron_test_utils::builders;
pub use gracecron_test_utils::{ManualTrigger, init_tracing, wait_until, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Scheduler options with a generous per-execution timeout.
pub fn config() -> SchedulerConfig {
    SchedulerConfig {
        timeout: Duration::from_secs(10),
        shutdown_timeout: Duration::from_secs(10),
        overlap: OverlapPolicy::Skip,
    }
}

pub fn manual_scheduler(config: SchedulerConfig) -> Scheduler<ManualTrigger> {
    Scheduler::new(config, ManualTrigger::new())
}

/// Wait until the latest record of `name` has `status`.
pub async fn wait_for_status<T: TriggerService>(
    scheduler: &Scheduler<T>,
    name: &str,
    status: JobStatus,
) -> Option<ExecutionRecord> {
    let seen = wait_until(
        || scheduler.status(name).is_some_and(|r| r.status == status),
        Duration::from_secs(5),
    )
    .await;
    if seen { scheduler.status(name) } else { None }
}
