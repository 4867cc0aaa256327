#![allow(dead_code)]

use std::collections::BTreeMap;

use gracecron::config::{ConfigFile, ConfigSection, JobConfig, RawConfigFile};
use gracecron::types::OverlapPolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.config.config.timeout = timeout.to_string();
        self
    }

    pub fn shutdown_timeout(mut self, timeout: &str) -> Self {
        self.config.config.shutdown_timeout = Some(timeout.to_string());
        self
    }

    pub fn overlap(mut self, policy: OverlapPolicy) -> Self {
        self.config.config.overlap = policy;
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(schedule: &str, cmd: &str) -> Self {
        Self {
            job: JobConfig {
                schedule: schedule.to_string(),
                cmd: cmd.to_string(),
                timeout: None,
            },
        }
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.job.timeout = Some(timeout.to_string());
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}
