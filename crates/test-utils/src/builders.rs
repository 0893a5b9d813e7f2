#![allow(dead_code)]

use std::collections::BTreeMap;

use frametasks::config::{ConfigFile, JobConfig, RawConfigFile, SchedulerSection};
use frametasks::{NestingPolicy, Priority};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                scheduler: SchedulerSection {
                    short_workers: 2,
                    long_workers: 1,
                    ..SchedulerSection::default()
                },
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_workers(mut self, short: usize, long: usize) -> Self {
        self.config.scheduler.short_workers = short;
        self.config.scheduler.long_workers = long;
        self
    }

    pub fn with_max_groups(mut self, max: usize) -> Self {
        self.config.scheduler.max_outstanding_groups = max;
        self
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
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
    pub fn new() -> Self {
        Self {
            job: JobConfig::default(),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.job.priority = priority;
        self
    }

    pub fn multiplicity(mut self, multiplicity: u32) -> Self {
        self.job.multiplicity = multiplicity;
        self
    }

    pub fn nesting(mut self, nesting: NestingPolicy) -> Self {
        self.job.nesting = nesting;
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn work_us(mut self, work_us: u64) -> Self {
        self.job.work_us = work_us;
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

impl Default for JobConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
