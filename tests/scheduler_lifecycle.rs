mod common;
use crate::common::{TestResult, config, init_tracing, manual_scheduler, wait_for_status};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gracecron::errors::GracecronError;
use gracecron::store::{CancelCause, ExecutionError};
use gracecron::types::{JobStatus, OverlapPolicy};

async fn explode() -> anyhow::Result<()> {
    panic!("boom")
}

#[tokio::test]
async fn completed_job_records_start_and_end() -> TestResult {
    init_tracing();
    let scheduler = manual_scheduler(config());
    scheduler.submit("@every 1h", "tidy", || async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        anyhow::Ok(())
    })?;
    scheduler.start();
    assert_eq!(scheduler.trigger().fire_all(), 1);

    let record = wait_for_status(&scheduler, "tidy", JobStatus::Completed)
        .await
        .ok_or("tidy never completed")?;
    let end = record.end_time.ok_or("missing end_time")?;
    assert!(end > record.start_time);
    assert!(record.error.is_none());
    assert!(scheduler.list_running().is_empty());
    Ok(())
}

#[tokio::test]
async fn failing_job_is_recorded_as_failed() -> TestResult {
    init_tracing();
    let scheduler = manual_scheduler(config());
    scheduler.submit("@every 1h", "backup", || async {
        Err::<(), _>(anyhow::anyhow!("disk full"))
    })?;
    scheduler.start();
    scheduler.trigger().fire_all();

    let record = wait_for_status(&scheduler, "backup", JobStatus::Failed)
        .await
        .ok_or("backup never failed")?;
    match record.error {
        Some(ExecutionError::Fault(msg)) => assert!(msg.contains("disk full")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(record.end_time.is_some());
    Ok(())
}

#[tokio::test]
async fn panicking_job_is_contained() -> TestResult {
    init_tracing();
    let scheduler = manual_scheduler(config());
    scheduler.submit("@every 1h", "explode", explode)?;
    scheduler.start();
    scheduler.trigger().fire_all();

    let record = wait_for_status(&scheduler, "explode", JobStatus::Failed)
        .await
        .ok_or("explode never failed")?;
    assert_eq!(
        record.error,
        Some(ExecutionError::Panicked("boom".to_string()))
    );

    // The scheduler keeps working after a panic.
    scheduler.trigger().fire_all();
    let again = wait_until_new_id(&scheduler, "explode", record.id.get()).await;
    assert!(again, "second execution never registered");
    Ok(())
}

async fn wait_until_new_id(
    scheduler: &gracecron::engine::Scheduler<common::ManualTrigger>,
    name: &str,
    old: u64,
) -> bool {
    common::wait_until(
        || scheduler.status(name).is_some_and(|r| r.id.get() > old),
        Duration::from_secs(5),
    )
    .await
}

#[tokio::test]
async fn distinct_names_do_not_interfere() -> TestResult {
    init_tracing();
    let scheduler = manual_scheduler(config());
    scheduler.submit("@every 1h", "slow", || async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        anyhow::Ok(())
    })?;
    scheduler.submit("@every 1h", "fast", || async { anyhow::Ok(()) })?;
    scheduler.start();
    assert_eq!(scheduler.trigger().fire_all(), 2);

    wait_for_status(&scheduler, "fast", JobStatus::Completed)
        .await
        .ok_or("fast never completed")?;
    let slow = scheduler.status("slow").ok_or("slow not registered")?;
    assert_eq!(slow.status, JobStatus::Running);
    assert_ne!(slow.id, scheduler.status("fast").ok_or("fast missing")?.id);

    wait_for_status(&scheduler, "slow", JobStatus::Completed)
        .await
        .ok_or("slow never completed")?;
    Ok(())
}

#[tokio::test]
async fn skip_policy_ignores_refire_while_running() -> TestResult {
    init_tracing();
    let runs = Arc::new(AtomicUsize::new(0));
    let scheduler = manual_scheduler(config());
    let counter = Arc::clone(&runs);
    scheduler.submit("@every 1h", "sync", move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            anyhow::Ok(())
        }
    })?;
    scheduler.start();

    scheduler.trigger().fire_all();
    let first = wait_for_status(&scheduler, "sync", JobStatus::Running)
        .await
        .ok_or("sync never started")?;
    scheduler.trigger().fire_all();

    let done = wait_for_status(&scheduler, "sync", JobStatus::Completed)
        .await
        .ok_or("sync never completed")?;
    assert_eq!(done.id, first.id);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn replace_policy_tracks_latest_execution() -> TestResult {
    init_tracing();
    let mut cfg = config();
    cfg.overlap = OverlapPolicy::Replace;
    let runs = Arc::new(AtomicUsize::new(0));
    let scheduler = manual_scheduler(cfg);
    let counter = Arc::clone(&runs);
    scheduler.submit("@every 1h", "sync", move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(150)).await;
            anyhow::Ok(())
        }
    })?;
    scheduler.start();

    scheduler.trigger().fire_all();
    let first = wait_for_status(&scheduler, "sync", JobStatus::Running)
        .await
        .ok_or("sync never started")?;
    scheduler.trigger().fire_all();
    assert!(wait_until_new_id(&scheduler, "sync", first.id.get()).await);

    let done = wait_for_status(&scheduler, "sync", JobStatus::Completed)
        .await
        .ok_or("sync never completed")?;
    assert!(done.id > first.id);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn per_job_timeout_cancels_the_record() -> TestResult {
    init_tracing();
    let scheduler = manual_scheduler(config());
    scheduler.submit_with_timeout("@every 1h", "stuck", Duration::from_millis(50), || async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        anyhow::Ok(())
    })?;
    scheduler.start();
    scheduler.trigger().fire_all();

    let record = wait_for_status(&scheduler, "stuck", JobStatus::Cancelled)
        .await
        .ok_or("stuck never cancelled")?;
    assert_eq!(
        record.error,
        Some(ExecutionError::DeadlineExceeded(CancelCause::Timeout(
            Duration::from_millis(50)
        )))
    );
    // The record is only finalized once the work itself returned.
    let elapsed = record.elapsed().ok_or("no elapsed")?;
    assert!(elapsed >= chrono::Duration::milliseconds(140));
    Ok(())
}

#[tokio::test]
async fn submit_rejects_duplicates_and_bad_schedules() -> TestResult {
    init_tracing();
    let scheduler = manual_scheduler(config());
    let id = scheduler.submit("*/5 * * * * *", "report", || async { anyhow::Ok(()) })?;
    assert_eq!(
        scheduler.trigger().schedule_of(id).as_deref(),
        Some("*/5 * * * * *")
    );
    assert_eq!(scheduler.config().overlap, OverlapPolicy::Skip);

    let dup = scheduler.submit("@every 1s", "report", || async { anyhow::Ok(()) });
    assert!(matches!(dup, Err(GracecronError::DuplicateJob(name)) if name == "report"));

    let bad = scheduler.submit("every tuesday", "other", || async { anyhow::Ok(()) });
    assert!(matches!(bad, Err(GracecronError::ScheduleParse { .. })));

    let huge = scheduler.submit("@every 6000000000000000h", "huge", || async {
        anyhow::Ok(())
    });
    assert!(matches!(huge, Err(GracecronError::ScheduleParse { .. })));

    assert_eq!(scheduler.job_names(), vec!["report".to_string()]);
    assert_eq!(scheduler.trigger().job_count(), 1);
    Ok(())
}

#[tokio::test]
async fn nothing_fires_before_start() -> TestResult {
    init_tracing();
    let scheduler = manual_scheduler(config());
    scheduler.submit("@every 1h", "early", || async { anyhow::Ok(()) })?;

    assert_eq!(scheduler.trigger().fire_all(), 0);
    assert!(scheduler.status("early").is_none());

    scheduler.start();
    scheduler.start();
    assert!(scheduler.trigger().is_started());
    Ok(())
}
