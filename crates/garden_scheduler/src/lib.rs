//! The task graph scheduler.
//!
//! Runs a validated set of [`TaskNode`]s to completion, respecting
//! dependency order, a bounded concurrency limit, per-node timeouts,
//! cooperative cancellation, and cross-run memoization via [`ResultCache`].

mod cache;
mod error;
mod node;
mod process;
mod report;
mod scheduler;

pub use cache::ResultCache;
pub use error::SchedulerError;
pub use node::{CacheKey, NodeKind, NodeState, TaskKey, TaskNode};
pub use process::{Process, ProcessFuture};
pub use report::ExecutionReport;
pub use scheduler::Scheduler;
