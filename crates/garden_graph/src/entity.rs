//! Entity identity and the parsed shape of service/task/test configs.
//!
//! Service, task, and test configs arrive from a module's `configure`
//! handler as opaque [`serde_json::Value`]s (the module type defines their
//! real shape). This crate only needs three fields out of each: `name`,
//! `dependencies`, and for tasks/tests an optional `timeout`; everything
//! else is carried along as `spec` for downstream consumers (the action
//! router, the runtime context builder).

use serde_json::Value;

use crate::error::GraphError;

/// Which of the four entity kinds a [`EntityRef`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// A module.
    Module,
    /// A service.
    Service,
    /// A task.
    Task,
    /// A test.
    Test,
}

impl EntityKind {
    /// The edge label this kind's own declared dependencies are recorded
    /// under: `service`, `task`, `test`. Modules use `build` and are
    /// handled separately, since their dependency field is
    /// `build.dependencies`, not `dependencies`.
    #[must_use]
    pub fn edge_label(self) -> &'static str {
        match self {
            EntityKind::Module => "build",
            EntityKind::Service => "service",
            EntityKind::Task => "task",
            EntityKind::Test => "test",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntityKind::Module => "module",
            EntityKind::Service => "service",
            EntityKind::Task => "task",
            EntityKind::Test => "test",
        };
        write!(f, "{label}")
    }
}

/// A reference to a single graph node: its kind and name.
///
/// Service, task, and test names live in a shared namespace distinct from
/// module names (a module's `name` never collides with its own services,
/// tasks, or tests since the config graph tracks them under separate
/// kinds), but an [`EntityRef`] always disambiguates by kind regardless.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    /// The entity's kind.
    pub kind: EntityKind,
    /// The entity's name.
    pub name: String,
}

impl EntityRef {
    /// Builds a reference to a module.
    #[must_use]
    pub fn module(name: impl Into<String>) -> Self {
        Self { kind: EntityKind::Module, name: name.into() }
    }

    /// Builds a reference to a service.
    #[must_use]
    pub fn service(name: impl Into<String>) -> Self {
        Self { kind: EntityKind::Service, name: name.into() }
    }

    /// Builds a reference to a task.
    #[must_use]
    pub fn task(name: impl Into<String>) -> Self {
        Self { kind: EntityKind::Task, name: name.into() }
    }

    /// Builds a reference to a test.
    #[must_use]
    pub fn test(name: impl Into<String>) -> Self {
        Self { kind: EntityKind::Test, name: name.into() }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// A service, parsed out of a module's synthesized `serviceConfigs` entry.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// The service's name.
    pub name: String,
    /// The module that declared it.
    pub module: String,
    /// Other services or tasks this service depends on.
    pub dependencies: Vec<String>,
    /// The service's own fields, module-type-specific.
    pub spec: Value,
}

/// A task, parsed out of a module's `tasks` field or synthesized
/// `taskConfigs` entry.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// The task's name.
    pub name: String,
    /// The module that declared it.
    pub module: String,
    /// Other services or tasks this task depends on.
    pub dependencies: Vec<String>,
    /// Optional timeout, in seconds, after which the running handler is
    /// cancelled and the task fails with `Timeout`.
    pub timeout_seconds: Option<u64>,
    /// The task's own fields, module-type-specific.
    pub spec: Value,
}

/// A test, parsed out of a module's `tests` field or synthesized
/// `testConfigs` entry.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// The test's name, unique within its module (the config graph
    /// qualifies it as `<module>.<name>` to form a globally unique
    /// [`EntityRef`] name).
    pub name: String,
    /// The module that declared it.
    pub module: String,
    /// Other services or tasks this test depends on.
    pub dependencies: Vec<String>,
    /// Optional timeout, in seconds.
    pub timeout_seconds: Option<u64>,
    /// The test's own fields, module-type-specific.
    pub spec: Value,
}

fn string_field(value: &Value, field: &str, module: &str) -> Result<String, GraphError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| GraphError::MissingField { module: module.to_string(), field: field.to_string() })
}

fn dependencies_field(value: &Value) -> Vec<String> {
    value
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|deps| deps.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn timeout_field(value: &Value) -> Option<u64> {
    value.get("timeout").and_then(Value::as_u64)
}

/// Parses a module's `serviceConfigs` entry.
pub fn parse_service(module: &str, value: &Value) -> Result<ServiceConfig, GraphError> {
    Ok(ServiceConfig {
        name: string_field(value, "name", module)?,
        module: module.to_string(),
        dependencies: dependencies_field(value),
        spec: value.clone(),
    })
}

/// Parses a module's `taskConfigs`/`tasks` entry.
pub fn parse_task(module: &str, value: &Value) -> Result<TaskConfig, GraphError> {
    Ok(TaskConfig {
        name: string_field(value, "name", module)?,
        module: module.to_string(),
        dependencies: dependencies_field(value),
        timeout_seconds: timeout_field(value),
        spec: value.clone(),
    })
}

/// Parses a module's `testConfigs`/`tests` entry.
pub fn parse_test(module: &str, value: &Value) -> Result<TestConfig, GraphError> {
    Ok(TestConfig {
        name: string_field(value, "name", module)?,
        module: module.to_string(),
        dependencies: dependencies_field(value),
        timeout_seconds: timeout_field(value),
        spec: value.clone(),
    })
}
