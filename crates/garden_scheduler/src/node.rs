//! Task graph nodes: the scheduler's unit of work.

use std::sync::Arc;
use std::time::Duration;

use crate::process::Process;

/// The kind of work a [`TaskNode`] performs, and the tie-break priority
/// used when multiple nodes become ready at once: `build < resolve-provider
/// < deploy < task < test`, with `publish` and `delete` ordered after
/// `test` since no stronger ordering is given for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
    /// Building a module.
    Build,
    /// Resolving (configuring and readying) a provider.
    ResolveProvider,
    /// Deploying a service.
    Deploy,
    /// Running a task.
    Task,
    /// Running a test.
    Test,
    /// Publishing a module.
    Publish,
    /// Deleting a deployed service.
    Delete,
}

impl NodeKind {
    fn priority(self) -> u8 {
        match self {
            NodeKind::Build => 0,
            NodeKind::ResolveProvider => 1,
            NodeKind::Deploy => 2,
            NodeKind::Task => 3,
            NodeKind::Test => 4,
            NodeKind::Publish => 5,
            NodeKind::Delete => 6,
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NodeKind::Build => "build",
            NodeKind::ResolveProvider => "resolve-provider",
            NodeKind::Deploy => "deploy",
            NodeKind::Task => "task",
            NodeKind::Test => "test",
            NodeKind::Publish => "publish",
            NodeKind::Delete => "delete",
        };
        write!(f, "{label}")
    }
}

/// A task node's identity within a single scheduler run: its kind and
/// target name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey {
    /// The node's kind.
    pub kind: NodeKind,
    /// The target's name (module, service, task, or test name).
    pub name: String,
}

impl TaskKey {
    /// Builds a task key.
    #[must_use]
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    /// The `(type-priority, name)` ordering key used to break ties among
    /// simultaneously ready nodes.
    pub(crate) fn tie_break(&self) -> (u8, &str) {
        (self.kind.priority(), self.name.as_str())
    }
}

impl std::fmt::Display for TaskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// The memoization key: a [`TaskKey`] plus the content version it was
/// computed against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    /// The node's kind.
    pub kind: NodeKind,
    /// The target's name.
    pub name: String,
    /// The version the result was computed for. Module/task/test nodes use
    /// their content-addressed version; provider nodes use a stable marker
    /// (e.g. the provider's resolved config hash, or simply `"static"` if
    /// providers never change within a run).
    pub version: String,
}

/// A unit of scheduler work: what it depends on, how to run it, and the
/// version it memoizes against.
#[derive(Clone)]
pub struct TaskNode {
    /// This node's identity.
    pub key: TaskKey,
    /// The version participating in memoization (see [`CacheKey`]).
    pub version: String,
    /// Other nodes that must be `complete` before this one becomes `ready`.
    pub dependencies: Vec<TaskKey>,
    /// If set, the handler is cancelled and the node fails with
    /// [`crate::SchedulerError::Timeout`] if it runs longer than this.
    pub timeout: Option<Duration>,
    /// Disables the memoization cache for this node specifically.
    pub force: bool,
    /// The work itself.
    pub process: Arc<dyn Process>,
}

impl TaskNode {
    /// This node's memoization key.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey { kind: self.key.kind, name: self.key.name.clone(), version: self.version.clone() }
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("key", &self.key)
            .field("version", &self.version)
            .field("dependencies", &self.dependencies)
            .field("timeout", &self.timeout)
            .field("force", &self.force)
            .finish_non_exhaustive()
    }
}

/// A node's place in the state machine: *pending → ready → in-progress →
/// { complete, failed, skipped, cancelled }*.
#[derive(Debug, Clone)]
pub enum NodeState {
    /// Waiting on one or more dependencies.
    Pending,
    /// Every dependency is terminal and successful; eligible for dispatch.
    Ready,
    /// Dispatched; its `process` is running.
    InProgress,
    /// Finished successfully, with its output.
    Complete(serde_json::Value),
    /// Finished with an error.
    Failed(String),
    /// Never ran because a dependency failed, was skipped, or was
    /// cancelled.
    Skipped {
        /// Always `"dependencyFailed"` today; a distinct field in case
        /// other skip reasons are added later.
        reason: String,
    },
    /// Never ran because the run was cancelled before it could dispatch.
    Cancelled,
}

impl NodeState {
    /// Whether this state is one of the four terminal states.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeState::Complete(_) | NodeState::Failed(_) | NodeState::Skipped { .. } | NodeState::Cancelled)
    }

    /// Whether this state is a successful terminal state.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        matches!(self, NodeState::Complete(_))
    }
}
