// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::model::{ConfigFile, JobDefinition, RawConfigFile};
use crate::engine::SchedulerConfig;
use crate::errors::{GracecronError, Result};
use crate::trigger::Schedule;
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GracecronError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_jobs(&raw)?;
        let scheduler = validate_global_config(&raw)?;
        let jobs = validate_jobs(&raw, &scheduler)?;
        Ok(ConfigFile::new_unchecked(scheduler, jobs))
    }
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(GracecronError::ConfigError(
            "config must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<SchedulerConfig> {
    let timeout = positive_duration("[config].timeout", &cfg.config.timeout)?;
    let shutdown_timeout = match cfg.config.shutdown_timeout.as_deref() {
        Some(s) => positive_duration("[config].shutdown_timeout", s)?,
        None => timeout,
    };

    Ok(SchedulerConfig {
        timeout,
        shutdown_timeout,
        overlap: cfg.config.overlap,
    })
}

fn validate_jobs(
    cfg: &RawConfigFile,
    scheduler: &SchedulerConfig,
) -> Result<BTreeMap<String, JobDefinition>> {
    let mut jobs = BTreeMap::new();

    for (name, job) in cfg.job.iter() {
        if name.trim().is_empty() {
            return Err(GracecronError::ConfigError(
                "job names must not be empty".to_string(),
            ));
        }
        if job.cmd.trim().is_empty() {
            return Err(GracecronError::ConfigError(format!(
                "job '{}' has an empty `cmd`",
                name
            )));
        }

        // Surface schedule errors at load time rather than at submit.
        Schedule::parse(&job.schedule)?;

        let timeout = match job.timeout.as_deref() {
            Some(s) => positive_duration(&format!("[job.{}].timeout", name), s)?,
            None => scheduler.timeout,
        };

        jobs.insert(
            name.clone(),
            JobDefinition {
                name: name.clone(),
                schedule: job.schedule.clone(),
                cmd: job.cmd.clone(),
                timeout,
            },
        );
    }

    Ok(jobs)
}

fn positive_duration(field: &str, value: &str) -> Result<Duration> {
    let duration = parse_duration(value)
        .map_err(|e| GracecronError::ConfigError(format!("{field}: {e}")))?;
    if duration.is_zero() {
        return Err(GracecronError::ConfigError(format!(
            "{field} must be greater than zero (got \"{value}\")"
        )));
    }
    Ok(duration)
}
