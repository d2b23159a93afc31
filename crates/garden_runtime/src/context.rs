//! Building the `RuntimeContext` a handler invocation is dispatched with.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use tracing::debug;

/// A dependent service's status and outputs, as last observed by
/// `getServiceStatus` or a completed `deployService`.
#[derive(Debug, Clone, Default)]
pub struct ServiceRuntimeStatus {
    /// The service's state, e.g. `"deployed"`, `"outdated"`, `"missing"`.
    pub state: String,
    /// Outputs exposed to templates as `runtime.services.<name>.outputs.*`.
    pub outputs: BTreeMap<String, Value>,
}

/// The already-computed outputs and statuses of a target's dependencies,
/// gathered by the task graph scheduler before dispatch.
#[derive(Debug, Clone, Default)]
pub struct DependencyOutputs {
    /// Dependency services, keyed by name.
    pub services: BTreeMap<String, ServiceRuntimeStatus>,
    /// Dependency task outputs, keyed by name.
    pub tasks: BTreeMap<String, BTreeMap<String, Value>>,
}

/// The merged context a handler invocation is run with: environment
/// variables (all coerced to strings) and the structured `runtime.*` tree
/// the action router's runtime template pass resolves against.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    env: BTreeMap<String, String>,
    runtime: Value,
}

impl RuntimeContext {
    /// The merged, string-coerced environment variables: the module's
    /// declared `env`, overlaid by the target's own `env`.
    #[must_use]
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// The template-resolution context: `{ "runtime": { "services": ..., "tasks": ... } }`,
    /// ready to pass to the template resolver's runtime pass.
    #[must_use]
    pub fn template_context(&self) -> Value {
        json!({ "runtime": self.runtime })
    }
}

/// Builds a [`RuntimeContext`] for a target entity (a service, task, or
/// test) about to be dispatched.
///
/// `module_env` and `target_env` are the raw `env` objects declared on the
/// owning module and on the target itself; the target's own values take
/// precedence on key collision.
#[must_use]
pub fn build_runtime_context(module_env: &Value, target_env: &Value, dependencies: &DependencyOutputs) -> RuntimeContext {
    debug!(services = dependencies.services.len(), tasks = dependencies.tasks.len(), "building runtime context");

    let mut env = coerce_env(module_env);
    env.extend(coerce_env(target_env));

    let mut services = Map::new();
    for (name, status) in &dependencies.services {
        services.insert(
            name.clone(),
            json!({
                "status": status.state,
                "outputs": status.outputs,
            }),
        );
    }

    let mut tasks = Map::new();
    for (name, outputs) in &dependencies.tasks {
        tasks.insert(name.clone(), json!({ "outputs": outputs }));
    }

    RuntimeContext { env, runtime: Value::Object(Map::from_iter([("services".to_string(), Value::Object(services)), ("tasks".to_string(), Value::Object(tasks))])) }
}

fn coerce_env(value: &Value) -> BTreeMap<String, String> {
    let Some(object) = value.as_object() else {
        return BTreeMap::new();
    };
    object.iter().map(|(key, val)| (key.clone(), stringify(val))).collect()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
