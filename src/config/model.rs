// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::SchedulerConfig;
use crate::types::OverlapPolicy;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// timeout = "30s"
/// shutdown_timeout = "45s"
/// overlap = "skip"
///
/// [job.backup]
/// schedule = "*/5 * * * * *"
/// cmd = "sleep 20"
/// timeout = "1m"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Per-execution deadline, e.g. `"30s"`.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Shutdown wait ceiling; falls back to `timeout` when absent.
    #[serde(default)]
    pub shutdown_timeout: Option<String>,

    /// `"skip"` (default) or `"replace"`.
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

fn default_timeout() -> String {
    "30s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            shutdown_timeout: None,
            overlap: OverlapPolicy::default(),
        }
    }
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Cron expression with seconds, or `@every <duration>`.
    pub schedule: String,

    /// Shell command to run on every firing.
    pub cmd: String,

    /// Optional per-job deadline overriding `[config].timeout`.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// Validated configuration with parsed durations.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerConfig,
    pub jobs: BTreeMap<String, JobDefinition>,
}

/// One validated job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefinition {
    pub name: String,
    pub schedule: String,
    pub cmd: String,
    pub timeout: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerConfig,
        jobs: BTreeMap<String, JobDefinition>,
    ) -> Self {
        Self { scheduler, jobs }
    }
}
