// src/exec/mod.rs

//! Execution layer.
//!
//! - [`job`] defines the [`Job`] unit-of-work trait.
//! - [`wrapper`] turns a job into a tracked, deadline-bound execution.
//! - [`command`] provides [`CommandJob`], which runs a shell command with
//!   `tokio::process::Command`.

pub mod command;
pub mod job;
pub mod wrapper;

pub use command::CommandJob;
pub use job::{Job, JobFuture};
pub use wrapper::ExecutionWrapper;
