// src/config/mod.rs

//! Configuration loading and validation for frametasks.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate scheduler limits and the job DAG (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_and_validate};
pub use model::{ConfigFile, JobConfig, RawConfigFile, SchedulerSection};
