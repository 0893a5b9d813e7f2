// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{NestingPolicy, Priority};

/// Configuration exactly as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// short_workers = 4
/// long_workers = 2
///
/// [job.animation]
/// priority = "early_this_frame"
/// multiplicity = 8
/// nesting = "never"
/// work_us = 250
///
/// [job.render_prep]
/// after = ["animation"]
/// ```
///
/// Every section is optional. Turn it into a [`ConfigFile`] with
/// `ConfigFile::try_from`, which runs validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Jobs from `[job.<name>]`, keyed by name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(scheduler: SchedulerSection, job: BTreeMap<String, JobConfig>) -> Self {
        Self { scheduler, job }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchedulerSection {
    /// Workers for this-frame work. Defaults to one less than the number of
    /// available cores, but at least one.
    #[serde(default = "default_short_workers")]
    pub short_workers: usize,

    #[serde(default = "default_long_workers")]
    pub long_workers: usize,

    /// Per-pool cap, including replacement threads for blocked workers.
    #[serde(default = "default_max_workers_per_pool")]
    pub max_workers_per_pool: usize,

    #[serde(default = "default_max_outstanding_groups")]
    pub max_outstanding_groups: usize,

    #[serde(default = "default_target_frame_time_ms")]
    pub target_frame_time_ms: f64,
}

fn default_short_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .clamp(1, default_max_workers_per_pool())
}

fn default_long_workers() -> usize {
    2
}

fn default_max_workers_per_pool() -> usize {
    64
}

fn default_max_outstanding_groups() -> usize {
    4096
}

fn default_target_frame_time_ms() -> f64 {
    1000.0 / 60.0
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            short_workers: default_short_workers(),
            long_workers: default_long_workers(),
            max_workers_per_pool: default_max_workers_per_pool(),
            max_outstanding_groups: default_max_outstanding_groups(),
            target_frame_time_ms: default_target_frame_time_ms(),
        }
    }
}

/// `[job.<name>]` section: one task group submitted every frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub priority: Priority,

    #[serde(default = "default_multiplicity")]
    pub multiplicity: u32,

    #[serde(default)]
    pub nesting: NestingPolicy,

    /// Jobs whose group must finish before this one starts.
    #[serde(default)]
    pub after: Vec<String>,

    /// Simulated work per invocation, in microseconds.
    #[serde(default)]
    pub work_us: u64,
}

fn default_multiplicity() -> u32 {
    1
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            priority: Priority::default(),
            multiplicity: default_multiplicity(),
            nesting: NestingPolicy::default(),
            after: Vec::new(),
            work_us: 0,
        }
    }
}
