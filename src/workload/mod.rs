// src/workload/mod.rs

//! Declarative workloads built from the `[job.*]` config sections.
//!
//! - [`graph`] orders jobs by their `after` dependencies.
//! - [`submit`] turns every job into a task and submits one group per job
//!   each frame.

pub mod graph;
pub mod submit;

pub use graph::JobGraph;
pub use submit::{FrameSubmission, Workload};
