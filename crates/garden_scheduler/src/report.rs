//! The outcome of a completed (or cancelled) scheduler run.

use std::collections::BTreeMap;

use crate::node::{NodeState, TaskKey};

/// Every node's final, terminal state after a [`crate::Scheduler::execute`]
/// run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Final state per node, always one of the four terminal
    /// [`NodeState`] variants.
    pub outcomes: BTreeMap<TaskKey, NodeState>,
}

impl ExecutionReport {
    /// Whether every node completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(NodeState::is_successful)
    }

    /// Every node that did not complete successfully, with its final state.
    pub fn failures(&self) -> impl Iterator<Item = (&TaskKey, &NodeState)> {
        self.outcomes.iter().filter(|(_, state)| !state.is_successful())
    }
}
