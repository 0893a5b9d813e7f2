// src/group/mod.rs

//! Task groups and their dependency bookkeeping.
//!
//! - [`id`] defines the generational [`GroupId`] handle.
//! - [`arena`] recycles group slots through a free list.
//! - [`inner`] holds the per-group counters, member tasks and dependency edges.

pub(crate) mod arena;
pub mod id;
pub(crate) mod inner;

pub use id::GroupId;
pub use inner::GroupCallback;
