// src/exec/job.rs

//! The unit of work abstraction.

use std::future::Future;
use std::pin::Pin;

/// Future returned by a single run of a [`Job`].
pub type JobFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// A zero-argument unit of work that can be run any number of times.
///
/// Each call to [`Job::run`] is one execution. Returning `Err` marks the
/// execution `Failed`; panicking does too, without taking the process down.
///
/// Any `Fn() -> impl Future<Output = anyhow::Result<()>>` closure is a `Job`:
///
/// ```ignore
/// scheduler.submit("@every 5s", "ping", || async {
///     ping().await?;
///     anyhow::Ok(())
/// })?;
/// ```
pub trait Job: Send + Sync + 'static {
    fn run(&self) -> JobFuture;
}

impl<F, Fut> Job for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run(&self) -> JobFuture {
        Box::pin(self())
    }
}
