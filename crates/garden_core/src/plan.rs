//! Planning and executing a task graph: turns an [`ActionRequest`] into a
//! set of scheduler nodes, each dispatching through the action router with
//! a runtime context assembled from its already-complete dependencies.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use garden_action::{ActionTarget, dispatch};
use garden_graph::{ConfigGraph, EntityRef};
use garden_hasher::extend_version;
use garden_plugin::ResolvedRegistry;
use garden_runtime::{DependencyOutputs, ServiceRuntimeStatus, build_runtime_context};
use garden_scheduler::{ExecutionReport, NodeKind, Process, ProcessFuture, ResultCache, Scheduler, SchedulerError, TaskKey, TaskNode};
use globset::Glob;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::project::Project;

/// The lifecycle action a [`Project::plan`] call plans a task graph for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Builds modules (and, transitively, every build dependency).
    Build,
    /// Deploys services (and the builds and service/task dependencies they need).
    Deploy,
    /// Runs tests.
    Test,
    /// Runs tasks.
    RunTask,
    /// Publishes modules.
    Publish,
    /// Deletes deployed services.
    Delete,
}

/// A request to plan a task graph for one [`Command`], optionally narrowed
/// to a subset of named targets.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// The lifecycle action being planned.
    pub command: Command,
    /// A glob matched against target names (service/task/test/module names,
    /// depending on `command`). `None` selects every eligible target.
    pub name_filter: Option<String>,
    /// Disables memoization for every planned node.
    pub force: bool,
    /// Disables memoization for build nodes specifically, even when
    /// `force` is left `false` for the rest of the plan.
    pub force_build: bool,
    /// Upper bound on concurrently dispatched nodes.
    pub concurrency_limit: usize,
    /// Per-node timeout applied to every planned node that doesn't specify
    /// its own (currently: all of them; task/test-specific timeouts are
    /// read from their own config when present).
    pub default_timeout: Option<Duration>,
}

impl ActionRequest {
    /// A request for `command` targeting everything eligible, with no
    /// filter, no forcing, and a `cores × 2` concurrency limit.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            name_filter: None,
            force: false,
            force_build: false,
            concurrency_limit: default_concurrency_limit(),
            default_timeout: None,
        }
    }

    /// Narrows the request to targets matching `pattern` (a glob).
    #[must_use]
    pub fn with_name_filter(mut self, pattern: impl Into<String>) -> Self {
        self.name_filter = Some(pattern.into());
        self
    }

    /// Sets `force`.
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Sets `force_build`.
    #[must_use]
    pub fn with_force_build(mut self, force_build: bool) -> Self {
        self.force_build = force_build;
        self
    }
}

fn default_concurrency_limit() -> usize {
    std::thread::available_parallelism().map(|n| n.get() * 2).unwrap_or(4)
}

/// A planned, not-yet-run task graph: [`Project::plan`]'s result.
pub struct TaskGraph {
    scheduler: Scheduler,
}

/// Options for a single [`TaskGraph::execute`] run.
pub struct ExecuteOptions {
    /// The memoization cache to consult and update. Pass a cache returned
    /// by a previous run to carry memoization across plans within the same
    /// process.
    pub cache: ResultCache,
    /// Signals cooperative cancellation of the run.
    pub cancel: CancellationToken,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { cache: ResultCache::new(), cancel: CancellationToken::new() }
    }
}

/// The outcome of a [`TaskGraph::execute`] run: the final state of every
/// node, plus the (possibly updated) memoization cache.
pub struct ExecuteResult {
    /// Every node's terminal state.
    pub report: ExecutionReport,
    /// The cache, updated with every node that completed successfully.
    pub cache: ResultCache,
}

impl TaskGraph {
    /// Runs every node to a terminal state.
    pub async fn execute(self, opts: ExecuteOptions) -> ExecuteResult {
        let (report, cache) = self.scheduler.execute(opts.cache, opts.cancel).await;
        ExecuteResult { report, cache }
    }
}

impl Project {
    /// Plans a task graph for `action`: selects the targets `action` names
    /// (or every eligible target, with no filter), then recursively pulls
    /// in every build, service, and task dependency each selected target
    /// needs, producing one [`TaskNode`] per entity touched.
    pub fn plan(&self, action: ActionRequest) -> Result<TaskGraph, CoreError> {
        let matcher = match &action.name_filter {
            Some(pattern) => {
                Some(Glob::new(pattern).map_err(|source| CoreError::InvalidNameFilter { pattern: pattern.clone(), source })?.compile_matcher())
            }
            None => None,
        };
        let matches = |name: &str| matcher.as_ref().is_none_or(|m| m.is_match(name));

        let mut builder = PlanBuilder {
            graph: Arc::clone(&self.graph),
            registry: Arc::clone(&self.registry),
            outputs: Arc::new(RwLock::new(BTreeMap::new())),
            force: action.force,
            force_build: action.force_build,
            timeout: action.default_timeout,
            nodes: BTreeMap::new(),
        };

        match action.command {
            Command::Build => {
                for module in self.graph.modules() {
                    if matches(&module.name) {
                        builder.ensure_build(&module.name)?;
                    }
                }
            }
            Command::Deploy => {
                for service in self.graph.services() {
                    if matches(&service.name) {
                        builder.ensure_deploy(&service.name)?;
                    }
                }
            }
            Command::Test => {
                for test in self.graph.tests() {
                    if matches(&test.name) {
                        builder.ensure_test(&test.module, &test.name)?;
                    }
                }
            }
            Command::RunTask => {
                for task in self.graph.tasks() {
                    if matches(&task.name) {
                        builder.ensure_task(&task.name)?;
                    }
                }
            }
            Command::Publish => {
                for module in self.graph.modules() {
                    if module.allow_publish && matches(&module.name) {
                        builder.ensure_publish(&module.name)?;
                    }
                }
            }
            Command::Delete => {
                for service in self.graph.services() {
                    if matches(&service.name) {
                        builder.ensure_delete(&service.name)?;
                    }
                }
            }
        }

        let nodes: Vec<TaskNode> = builder.nodes.into_values().collect();
        let scheduler = Scheduler::new(nodes, action.concurrency_limit)?;
        Ok(TaskGraph { scheduler })
    }
}

type OutputStore = Arc<RwLock<BTreeMap<TaskKey, Value>>>;

struct PlanBuilder {
    graph: Arc<ConfigGraph>,
    registry: Arc<ResolvedRegistry>,
    outputs: OutputStore,
    force: bool,
    force_build: bool,
    timeout: Option<Duration>,
    nodes: BTreeMap<TaskKey, TaskNode>,
}

impl PlanBuilder {
    fn ensure_build(&mut self, module_name: &str) -> Result<TaskKey, CoreError> {
        let key = TaskKey::new(NodeKind::Build, module_name);
        if self.nodes.contains_key(&key) {
            return Ok(key);
        }
        let module = self
            .graph
            .module(module_name)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "module", target_name: module_name.to_string() })?
            .clone();

        let mut dependencies = Vec::new();
        for dep in module.build.dependencies.clone() {
            dependencies.push(self.ensure_build(&dep.name)?);
        }

        let target = ActionTarget::Module(module_name.to_string());
        let params = module.spec.clone();
        let env = module.env.clone();
        let process = self.dispatch_process(key.clone(), "build", target, params, env, Value::Null, Vec::new());

        self.nodes.insert(
            key.clone(),
            TaskNode {
                key: key.clone(),
                version: module.version.version_string.clone(),
                dependencies,
                timeout: self.timeout,
                force: self.force || self.force_build,
                process,
            },
        );
        Ok(key)
    }

    fn ensure_deploy(&mut self, service_name: &str) -> Result<TaskKey, CoreError> {
        let key = TaskKey::new(NodeKind::Deploy, service_name);
        if self.nodes.contains_key(&key) {
            return Ok(key);
        }
        let service = self
            .graph
            .service(service_name)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "service", target_name: service_name.to_string() })?
            .clone();
        let module = self
            .graph
            .module(&service.module)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "module", target_name: service.module.clone() })?
            .clone();

        let mut dependencies = vec![self.ensure_build(&service.module)?];
        let entity_deps = self.graph.direct_dependencies(&EntityRef::service(service_name.to_string()));
        for dep in &entity_deps {
            dependencies.push(self.ensure_entity_dependency(dep)?);
        }

        let target = ActionTarget::Service(service_name.to_string());
        let params = service.spec.clone();
        let env = module.env.clone();
        let target_env = service.spec.get("env").cloned().unwrap_or(Value::Null);
        let process = self.dispatch_process(key.clone(), "deployService", target, params, env, target_env, entity_deps.clone());

        self.nodes.insert(
            key.clone(),
            TaskNode {
                key: key.clone(),
                version: module.version.version_string.clone(),
                dependencies,
                timeout: self.timeout,
                force: self.force,
                process,
            },
        );
        Ok(key)
    }

    fn ensure_task(&mut self, task_name: &str) -> Result<TaskKey, CoreError> {
        let key = TaskKey::new(NodeKind::Task, task_name);
        if self.nodes.contains_key(&key) {
            return Ok(key);
        }
        let task = self
            .graph
            .task(task_name)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "task", target_name: task_name.to_string() })?
            .clone();
        let module = self
            .graph
            .module(&task.module)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "module", target_name: task.module.clone() })?
            .clone();

        let mut dependencies = vec![self.ensure_build(&task.module)?];
        let entity_deps = self.graph.direct_dependencies(&EntityRef::task(task_name.to_string()));
        let mut extra_dependency_versions = BTreeMap::new();
        for dep in &entity_deps {
            let dep_key = self.ensure_entity_dependency(dep)?;
            if let Some(dep_node) = self.nodes.get(&dep_key) {
                extra_dependency_versions.insert(dep.name.clone(), dep_node.version.clone());
            }
            dependencies.push(dep_key);
        }

        let target = ActionTarget::Task(task_name.to_string());
        let params = task.spec.clone();
        let env = module.env.clone();
        let target_env = task.spec.get("env").cloned().unwrap_or(Value::Null);
        let process = self.dispatch_process(key.clone(), "runTask", target, params, env, target_env, entity_deps);

        let version = extend_version(&module.version, &extra_dependency_versions);
        let timeout = task.timeout_seconds.map(Duration::from_secs).or(self.timeout);

        self.nodes.insert(
            key.clone(),
            TaskNode { key: key.clone(), version, dependencies, timeout, force: self.force, process },
        );
        Ok(key)
    }

    fn ensure_test(&mut self, module_name: &str, test_name: &str) -> Result<TaskKey, CoreError> {
        let key = TaskKey::new(NodeKind::Test, test_name);
        if self.nodes.contains_key(&key) {
            return Ok(key);
        }
        let test = self
            .graph
            .test(module_name, test_name)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "test", target_name: format!("{module_name}.{test_name}") })?
            .clone();
        let module = self
            .graph
            .module(module_name)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "module", target_name: module_name.to_string() })?
            .clone();

        let mut dependencies = vec![self.ensure_build(module_name)?];
        let entity_deps = self.graph.direct_dependencies(&EntityRef::test(format!("{module_name}.{test_name}")));
        let mut extra_dependency_versions = BTreeMap::new();
        for dep in &entity_deps {
            let dep_key = self.ensure_entity_dependency(dep)?;
            if let Some(dep_node) = self.nodes.get(&dep_key) {
                extra_dependency_versions.insert(dep.name.clone(), dep_node.version.clone());
            }
            dependencies.push(dep_key);
        }

        let target = ActionTarget::Test { module: module_name.to_string(), name: test_name.to_string() };
        let params = test.spec.clone();
        let env = module.env.clone();
        let target_env = test.spec.get("env").cloned().unwrap_or(Value::Null);
        let process = self.dispatch_process(key.clone(), "testModule", target, params, env, target_env, entity_deps);

        let version = extend_version(&module.version, &extra_dependency_versions);
        let timeout = test.timeout_seconds.map(Duration::from_secs).or(self.timeout);

        self.nodes.insert(
            key.clone(),
            TaskNode { key: key.clone(), version, dependencies, timeout, force: self.force, process },
        );
        Ok(key)
    }

    fn ensure_publish(&mut self, module_name: &str) -> Result<TaskKey, CoreError> {
        let key = TaskKey::new(NodeKind::Publish, module_name);
        if self.nodes.contains_key(&key) {
            return Ok(key);
        }
        let module = self
            .graph
            .module(module_name)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "module", target_name: module_name.to_string() })?
            .clone();

        let dependencies = vec![self.ensure_build(module_name)?];
        let target = ActionTarget::Module(module_name.to_string());
        let params = module.spec.clone();
        let env = module.env.clone();
        let process = self.dispatch_process(key.clone(), "publish", target, params, env, Value::Null, Vec::new());

        self.nodes.insert(
            key.clone(),
            TaskNode {
                key: key.clone(),
                version: module.version.version_string.clone(),
                dependencies,
                timeout: self.timeout,
                force: self.force,
                process,
            },
        );
        Ok(key)
    }

    fn ensure_delete(&mut self, service_name: &str) -> Result<TaskKey, CoreError> {
        let key = TaskKey::new(NodeKind::Delete, service_name);
        if self.nodes.contains_key(&key) {
            return Ok(key);
        }
        let service = self
            .graph
            .service(service_name)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "service", target_name: service_name.to_string() })?
            .clone();
        let module = self
            .graph
            .module(&service.module)
            .ok_or_else(|| CoreError::UnknownTarget { target_kind: "module", target_name: service.module.clone() })?;

        let target = ActionTarget::Service(service_name.to_string());
        let params = service.spec.clone();
        let env = module.env.clone();
        let process = self.dispatch_process(key.clone(), "deleteService", target, params, env, Value::Null, Vec::new());

        self.nodes.insert(
            key.clone(),
            TaskNode {
                key: key.clone(),
                version: module.version.version_string.clone(),
                dependencies: Vec::new(),
                timeout: self.timeout,
                force: self.force,
                process,
            },
        );
        Ok(key)
    }

    /// Ensures a scheduler node exists for a service/task `EntityRef` named
    /// as another entity's dependency, dispatching to the right `ensure_*`
    /// by its kind.
    fn ensure_entity_dependency(&mut self, entity: &EntityRef) -> Result<TaskKey, CoreError> {
        match entity.kind {
            garden_graph::EntityKind::Service => self.ensure_deploy(&entity.name),
            garden_graph::EntityKind::Task => self.ensure_task(&entity.name),
            garden_graph::EntityKind::Module | garden_graph::EntityKind::Test => {
                Err(CoreError::UnknownTarget { target_kind: entity.kind.edge_label(), target_name: entity.name.clone() })
            }
        }
    }

    /// Builds the process closure shared by every `ensure_*` method: at
    /// dispatch time, reads each of `dependencies`' already-complete
    /// outputs from the shared store (guaranteed present, since the
    /// scheduler only promotes a node to `ready` once every dependency is
    /// `complete`), assembles the runtime context, dispatches the action,
    /// and records this node's own result under `key` for any dependent
    /// still to come.
    fn dispatch_process(
        &self,
        key: TaskKey,
        action_type: &'static str,
        target: ActionTarget,
        params: Value,
        module_env: Value,
        target_env: Value,
        dependencies: Vec<EntityRef>,
    ) -> Arc<dyn Process> {
        let registry = Arc::clone(&self.registry);
        let graph = Arc::clone(&self.graph);
        let outputs = Arc::clone(&self.outputs);

        Arc::new(move |_cancel: CancellationToken| -> ProcessFuture {
            let key = key.clone();
            let action_type = action_type;
            let target = target.clone();
            let params = params.clone();
            let module_env = module_env.clone();
            let target_env = target_env.clone();
            let dependencies = dependencies.clone();
            let registry = Arc::clone(&registry);
            let graph = Arc::clone(&graph);
            let outputs = Arc::clone(&outputs);

            Box::pin(async move {
                let dependency_outputs = load_dependency_outputs(&outputs, &dependencies).await;
                let runtime = build_runtime_context(&module_env, &target_env, &dependency_outputs);

                let result = dispatch(action_type, &target, &params, &graph, &registry, &runtime, None)
                    .map_err(|source| SchedulerError::ProcessFailed { key: key.clone(), message: source.to_string() })?;

                outputs.write().await.insert(key, result.clone());
                Ok(result)
            })
        })
    }
}

async fn load_dependency_outputs(outputs: &OutputStore, dependencies: &[EntityRef]) -> DependencyOutputs {
    let store = outputs.read().await;
    let mut result = DependencyOutputs::default();
    for dep in dependencies {
        match dep.kind {
            garden_graph::EntityKind::Service => {
                let key = TaskKey::new(NodeKind::Deploy, dep.name.clone());
                if let Some(value) = store.get(&key) {
                    result.services.insert(dep.name.clone(), service_status_from(value));
                }
            }
            garden_graph::EntityKind::Task => {
                let key = TaskKey::new(NodeKind::Task, dep.name.clone());
                if let Some(value) = store.get(&key) {
                    result.tasks.insert(dep.name.clone(), task_outputs_from(value));
                }
            }
            garden_graph::EntityKind::Module | garden_graph::EntityKind::Test => {}
        }
    }
    result
}

fn service_status_from(value: &Value) -> ServiceRuntimeStatus {
    let state = value.get("state").and_then(Value::as_str).unwrap_or("unknown").to_string();
    let outputs = value
        .get("outputs")
        .and_then(Value::as_object)
        .map(|object| object.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    ServiceRuntimeStatus { state, outputs }
}

fn task_outputs_from(value: &Value) -> BTreeMap<String, Value> {
    value
        .get("outputs")
        .and_then(Value::as_object)
        .map(|object| object.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}
