// src/errors.rs

//! Crate-wide error type.
//!
//! Failures of individual job executions are not represented here; they are
//! recorded on the execution record as [`crate::store::ExecutionError`] and
//! never propagate to the scheduler.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GracecronError {
    #[error("Invalid schedule '{schedule}': {reason}")]
    ScheduleParse { schedule: String, reason: String },

    #[error("Job already submitted: {0}")]
    DuplicateJob(String),

    #[error("Job '{0}' is still running")]
    AlreadyRunning(String),

    #[error("Scheduler is shutting down")]
    ShuttingDown,

    #[error("Shutdown timed out after {timeout:?}; still running: {pending:?}")]
    ShutdownTimeout {
        timeout: Duration,
        pending: Vec<String>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GracecronError>;
