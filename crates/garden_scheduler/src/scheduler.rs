//! The task graph scheduler's execution loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::ResultCache;
use crate::error::SchedulerError;
use crate::node::{NodeState, TaskKey, TaskNode};
use crate::report::ExecutionReport;

/// A validated task graph, ready to run.
///
/// Construction (`new`) checks for duplicate keys, dangling dependencies,
/// and cycles; `execute` then runs a single-threaded coordinator loop that
/// owns all mutable scheduling state, dispatching dependency-ready nodes as
/// `tokio::spawn`ed tasks bounded by a semaphore and collecting their
/// results over an `mpsc` channel. Nodes never mutate shared state
/// directly; they only return a value or an error to the coordinator.
pub struct Scheduler {
    nodes: BTreeMap<TaskKey, TaskNode>,
    concurrency_limit: usize,
}

impl Scheduler {
    /// Builds a scheduler over `nodes`, bounding concurrent dispatch to
    /// `concurrency_limit` (clamped to at least 1).
    ///
    /// Collects every structural error found (duplicate keys, unknown
    /// dependencies, cycles) rather than stopping at the first.
    pub fn new(nodes: Vec<TaskNode>, concurrency_limit: usize) -> Result<Self, Vec<SchedulerError>> {
        let mut errors = Vec::new();
        let mut map: BTreeMap<TaskKey, TaskNode> = BTreeMap::new();
        for node in nodes {
            if map.contains_key(&node.key) {
                errors.push(SchedulerError::DuplicateNode { key: node.key.clone() });
                continue;
            }
            map.insert(node.key.clone(), node);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        for node in map.values() {
            for dependency in &node.dependencies {
                if !map.contains_key(dependency) {
                    errors.push(SchedulerError::UnknownDependency { key: node.key.clone(), dependency: dependency.clone() });
                }
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        if let Some(cycle) = find_cycle(&map) {
            return Err(vec![SchedulerError::CircularDependency { cycle }]);
        }

        Ok(Self { nodes: map, concurrency_limit: concurrency_limit.max(1) })
    }

    /// Runs every node to a terminal state: dispatches ready nodes up to
    /// the concurrency limit, consults `cache` before dispatch and updates
    /// it after every successful completion, and propagates `failed` to
    /// dependents as `skipped { reason: "dependencyFailed" }`.
    ///
    /// If `cancel` is signalled, no further nodes are dispatched; in-flight
    /// nodes are awaited to completion (their own handler receives a child
    /// cancellation token and should abort cooperatively), and every
    /// remaining non-terminal node is marked `cancelled`.
    ///
    /// Returns the final report and the (possibly updated) cache, handed
    /// back so a caller can reuse it across runs within the same process.
    pub async fn execute(self, mut cache: ResultCache, cancel: CancellationToken) -> (ExecutionReport, ResultCache) {
        let Scheduler { nodes, concurrency_limit } = self;
        let semaphore = Arc::new(Semaphore::new(concurrency_limit));
        let (tx, mut rx) = mpsc::channel::<(TaskKey, NodeState)>(nodes.len().max(1));

        let mut states: BTreeMap<TaskKey, NodeState> = nodes.keys().cloned().map(|key| (key, NodeState::Pending)).collect();
        let mut in_flight: usize = 0;

        loop {
            promote_ready(&nodes, &mut states);

            if states.values().all(NodeState::is_terminal) {
                break;
            }

            let mut progressed = false;

            if !cancel.is_cancelled() {
                let mut ready: Vec<TaskKey> =
                    states.iter().filter(|(_, state)| matches!(state, NodeState::Ready)).map(|(key, _)| key.clone()).collect();
                ready.sort_by(|a, b| a.tie_break().cmp(&b.tie_break()));

                for key in ready {
                    let node = &nodes[&key];
                    if !node.force
                        && let Some(cached) = cache.get(&node.cache_key())
                    {
                        debug!(task = %key, "memoization hit");
                        states.insert(key, NodeState::Complete(cached.clone()));
                        progressed = true;
                        continue;
                    }
                    if cancel.is_cancelled() {
                        break;
                    }
                    let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                        break;
                    };
                    states.insert(key.clone(), NodeState::InProgress);
                    in_flight += 1;
                    progressed = true;
                    debug!(task = %key, "dispatching task");
                    tokio::spawn(run_node(node.clone(), permit, tx.clone(), cancel.clone()));
                }
            }

            if in_flight == 0 {
                if progressed {
                    continue;
                }
                cancel_remaining(&mut states);
                break;
            }

            if let Some((key, state)) = rx.recv().await {
                in_flight -= 1;
                if let NodeState::Complete(value) = &state {
                    cache.insert(nodes[&key].cache_key(), value.clone());
                }
                states.insert(key, state);
            }
        }

        (ExecutionReport { outcomes: states }, cache)
    }
}

async fn run_node(node: TaskNode, permit: tokio::sync::OwnedSemaphorePermit, tx: mpsc::Sender<(TaskKey, NodeState)>, cancel: CancellationToken) {
    let _permit = permit;
    let key = node.key.clone();
    let child = cancel.child_token();

    let state = match node.timeout {
        Some(duration) => match tokio::time::timeout(duration, node.process.run(child.clone())).await {
            Ok(Ok(value)) => NodeState::Complete(value),
            Ok(Err(err)) => NodeState::Failed(err.to_string()),
            Err(_) => {
                child.cancel();
                NodeState::Failed(SchedulerError::Timeout { key: key.clone() }.to_string())
            }
        },
        None => match node.process.run(child).await {
            Ok(value) => NodeState::Complete(value),
            Err(err) => NodeState::Failed(err.to_string()),
        },
    };

    let _ = tx.send((key, state)).await;
}

fn promote_ready(nodes: &BTreeMap<TaskKey, TaskNode>, states: &mut BTreeMap<TaskKey, NodeState>) {
    let pending: Vec<TaskKey> = states.iter().filter(|(_, state)| matches!(state, NodeState::Pending)).map(|(key, _)| key.clone()).collect();
    for key in pending {
        let mut any_failed = false;
        let mut all_complete = true;
        for dependency in &nodes[&key].dependencies {
            match states.get(dependency) {
                Some(state) if state.is_successful() => {}
                Some(state) if state.is_terminal() => {
                    any_failed = true;
                    all_complete = false;
                }
                _ => all_complete = false,
            }
        }
        if any_failed {
            states.insert(key, NodeState::Skipped { reason: "dependencyFailed".to_string() });
        } else if all_complete {
            states.insert(key, NodeState::Ready);
        }
    }
}

fn cancel_remaining(states: &mut BTreeMap<TaskKey, NodeState>) {
    for state in states.values_mut() {
        if !state.is_terminal() {
            *state = NodeState::Cancelled;
        }
    }
}

fn find_cycle(nodes: &BTreeMap<TaskKey, TaskNode>) -> Option<Vec<TaskKey>> {
    let mut visited = std::collections::BTreeSet::new();
    let mut visiting = Vec::new();

    fn visit(
        key: &TaskKey,
        nodes: &BTreeMap<TaskKey, TaskNode>,
        visited: &mut std::collections::BTreeSet<TaskKey>,
        visiting: &mut Vec<TaskKey>,
    ) -> Option<Vec<TaskKey>> {
        if visited.contains(key) {
            return None;
        }
        if let Some(pos) = visiting.iter().position(|k| k == key) {
            let mut cycle = visiting[pos..].to_vec();
            cycle.push(key.clone());
            return Some(cycle);
        }
        visiting.push(key.clone());
        for dependency in &nodes[key].dependencies {
            if let Some(cycle) = visit(dependency, nodes, visited, visiting) {
                return Some(cycle);
            }
        }
        visiting.pop();
        visited.insert(key.clone());
        None
    }

    for key in nodes.keys() {
        if let Some(cycle) = visit(key, nodes, &mut visited, &mut visiting) {
            return Some(cycle);
        }
    }
    None
}
