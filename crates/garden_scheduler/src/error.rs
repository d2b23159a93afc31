//! Errors raised while building or running a task graph.

use crate::node::TaskKey;

/// Errors produced by [`crate::Scheduler::new`] and surfaced as a node's
/// `Failed` state during [`crate::Scheduler::execute`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulerError {
    /// Two nodes were given the same [`TaskKey`].
    #[error("duplicate task node '{key}'")]
    DuplicateNode {
        /// The repeated key.
        key: TaskKey,
    },

    /// A node depends on a key no node in the run declares.
    #[error("task '{key}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// The dependent node.
        key: TaskKey,
        /// The undeclared dependency.
        dependency: TaskKey,
    },

    /// The task dependency graph contains a cycle.
    #[error("circular task dependency: {}", .cycle.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> "))]
    CircularDependency {
        /// The full cycle, repeating the start at the end.
        cycle: Vec<TaskKey>,
    },

    /// The node's handler ran longer than its configured timeout and was
    /// cancelled.
    #[error("task '{key}' timed out")]
    Timeout {
        /// The node that timed out.
        key: TaskKey,
    },

    /// The node's `process` returned an error.
    #[error("task '{key}' failed: {message}")]
    ProcessFailed {
        /// The failing node.
        key: TaskKey,
        /// The process's own error message.
        message: String,
    },
}
