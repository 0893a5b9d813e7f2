// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::group::GroupId;

#[derive(Error, Debug)]
pub enum FrametasksError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("task group {0} is stale (already finished or never created)")]
    StaleGroup(GroupId),

    #[error("task group {0} has already been started")]
    GroupAlreadyStarted(GroupId),

    #[error("task group {0} cannot depend on itself")]
    SelfDependency(GroupId),

    #[error("task '{0}' is still queued or running")]
    TaskInFlight(String),

    #[error("all {max} task group slots are in use")]
    GroupPoolExhausted { max: usize },

    #[error("this operation must be called from the thread that created the scheduler")]
    NotMainThread,

    #[error("task '{0}' has nesting policy `never` and must not wait on other work")]
    WaitInsideNeverNestingTask(String),

    #[error("the scheduler has been shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, FrametasksError>;
