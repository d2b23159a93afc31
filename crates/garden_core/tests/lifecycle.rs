//! End-to-end coverage of `Project::discover` -> `Project::plan` ->
//! `TaskGraph::execute` against a hand-authored `exec` module type plugin.

use std::fs;
use std::sync::Arc;

use garden_core::{ActionRequest, Command, CoreError, ExecuteOptions, Project};
use garden_module::ModuleError;
use garden_plugin::{HandlerEntry, HandlerTable, ModuleTypeDef, PluginDescriptor, PluginRegistry};
use garden_schema::Schema;
use garden_scheduler::{NodeKind, NodeState, TaskKey};
use serde_json::{Value, json};

const PROJECT_YAML: &str = "apiVersion: garden.io/v0\nkind: Project\nname: demo\ndefaultEnvironment: local\n";

const ALPHA_YAML: &str = "\
apiVersion: garden.io/v0
kind: Module
type: exec
name: alpha
include: []
spec:
  services:
    - name: svc-alpha
      dependencies: []
tasks:
  - name: task-alpha
    dependencies: []
tests:
  - name: unit
    dependencies: []
  - name: integration
    dependencies: []
";

const BETA_YAML: &str = "\
apiVersion: garden.io/v0
kind: Module
type: exec
name: beta
include: []
build:
  dependencies:
    - name: alpha
spec:
  services:
    - name: svc-beta
      dependencies: [svc-alpha]
tests:
  - name: unit
    dependencies: []
  - name: integ
    dependencies: []
";

/// A minimal module type whose `configure` handler turns `spec.services`
/// straight into `serviceConfigs`, and whose lifecycle handlers each return
/// a small, fixed result keyed on the target's own `name`.
fn exec_plugin() -> PluginDescriptor {
    let mut handlers = HandlerTable::new();
    handlers.insert(
        "configure".to_string(),
        Arc::new(HandlerEntry::leaf(Arc::new(|params| {
            let service_configs = params.get("spec").and_then(|spec| spec.get("services")).cloned().unwrap_or_else(|| json!([]));
            Ok(json!({
                "spec": params["spec"],
                "serviceConfigs": service_configs,
                "outputs": { "builtBy": params["name"] },
            }))
        }))),
    );
    handlers.insert("build".to_string(), Arc::new(HandlerEntry::leaf(Arc::new(|_params| Ok(json!({ "state": "built" }))))));
    handlers.insert(
        "deployService".to_string(),
        Arc::new(HandlerEntry::leaf(Arc::new(|params| {
            let name = params.get("name").and_then(Value::as_str).unwrap_or("service");
            Ok(json!({ "state": "deployed", "outputs": { "url": format!("http://{name}") } }))
        }))),
    );
    handlers.insert(
        "runTask".to_string(),
        Arc::new(HandlerEntry::leaf(Arc::new(|params| {
            let name = params.get("name").and_then(Value::as_str).unwrap_or("task");
            Ok(json!({ "state": "success", "outputs": { "result": format!("{name}-done") } }))
        }))),
    );
    handlers.insert("testModule".to_string(), Arc::new(HandlerEntry::leaf(Arc::new(|_params| Ok(json!({ "state": "passed" }))))));
    handlers.insert("publish".to_string(), Arc::new(HandlerEntry::leaf(Arc::new(|_params| Ok(json!({ "state": "published" }))))));
    handlers.insert("deleteService".to_string(), Arc::new(HandlerEntry::leaf(Arc::new(|_params| Ok(json!({ "state": "deleted" }))))));

    PluginDescriptor::new("exec-plugin").with_module_type(ModuleTypeDef {
        name: "exec".to_string(),
        schema: Schema::any(),
        docs: String::new(),
        handlers,
    })
}

fn write_alpha_beta_project(dir: &std::path::Path) {
    fs::write(dir.join("garden.yml"), PROJECT_YAML).unwrap();
    fs::create_dir(dir.join("alpha")).unwrap();
    fs::write(dir.join("alpha/garden.yml"), ALPHA_YAML).unwrap();
    fs::create_dir(dir.join("beta")).unwrap();
    fs::write(dir.join("beta/garden.yml"), BETA_YAML).unwrap();
}

#[tokio::test]
async fn build_runs_dependency_before_dependent_and_both_succeed() {
    let dir = tempfile::tempdir().unwrap();
    write_alpha_beta_project(dir.path());

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let plan = project.plan(ActionRequest::new(Command::Build).with_force(true).with_force_build(true)).unwrap();
    let result = plan.execute(ExecuteOptions::default()).await;

    assert!(result.report.is_success(), "unexpected failures: {:?}", result.report.failures().collect::<Vec<_>>());
    let beta_key = TaskKey::new(NodeKind::Build, "beta");
    assert!(matches!(result.report.outcomes[&beta_key], NodeState::Complete(_)));
}

#[tokio::test]
async fn deploy_resolves_service_dependency_and_runs_after_its_build() {
    let dir = tempfile::tempdir().unwrap();
    write_alpha_beta_project(dir.path());

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let plan = project.plan(ActionRequest::new(Command::Deploy).with_force(true).with_force_build(true)).unwrap();
    let result = plan.execute(ExecuteOptions::default()).await;

    assert!(result.report.is_success(), "unexpected failures: {:?}", result.report.failures().collect::<Vec<_>>());
    let keys: Vec<TaskKey> = result.report.outcomes.keys().cloned().collect();
    assert!(keys.contains(&TaskKey::new(NodeKind::Build, "alpha")));
    assert!(keys.contains(&TaskKey::new(NodeKind::Build, "beta")));
    assert!(keys.contains(&TaskKey::new(NodeKind::Deploy, "svc-alpha")));
    assert!(keys.contains(&TaskKey::new(NodeKind::Deploy, "svc-beta")));
}

#[tokio::test]
async fn test_name_filter_matches_only_the_glob() {
    let dir = tempfile::tempdir().unwrap();
    write_alpha_beta_project(dir.path());

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let plan = project.plan(ActionRequest::new(Command::Test).with_name_filter("int*").with_force(true).with_force_build(true)).unwrap();
    let result = plan.execute(ExecuteOptions::default()).await;

    assert!(result.report.is_success());
    let test_names: Vec<String> =
        result.report.outcomes.keys().filter(|k| k.kind == NodeKind::Test).map(|k| k.name.clone()).collect();
    assert_eq!(test_names.len(), 2);
    assert!(test_names.contains(&"integration".to_string()));
    assert!(test_names.contains(&"integ".to_string()));
    assert!(!test_names.contains(&"unit".to_string()));
}

#[tokio::test]
async fn run_task_output_is_visible_to_a_dependent_service() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("garden.yml"), PROJECT_YAML).unwrap();
    fs::create_dir(dir.path().join("alpha")).unwrap();
    fs::write(dir.path().join("alpha/garden.yml"), ALPHA_YAML).unwrap();
    fs::create_dir(dir.path().join("delta")).unwrap();
    fs::write(
        dir.path().join("delta/garden.yml"),
        "apiVersion: garden.io/v0\nkind: Module\ntype: exec\nname: delta\ninclude: []\nspec:\n  services:\n    - name: svc-delta\n      dependencies: [task-alpha]\n      endpoint: \"result=${runtime.tasks.task-alpha.outputs.result}\"\n",
    )
    .unwrap();

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let plan = project.plan(ActionRequest::new(Command::Deploy).with_name_filter("svc-delta").with_force(true).with_force_build(true)).unwrap();
    let result = plan.execute(ExecuteOptions::default()).await;

    assert!(result.report.is_success(), "unexpected failures: {:?}", result.report.failures().collect::<Vec<_>>());
    let key = TaskKey::new(NodeKind::Deploy, "svc-delta");
    assert!(matches!(&result.report.outcomes[&key], NodeState::Complete(_)));
}

#[tokio::test]
async fn unresolved_runtime_reference_fails_only_that_node() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("garden.yml"), PROJECT_YAML).unwrap();
    fs::create_dir(dir.path().join("gamma")).unwrap();
    fs::write(
        dir.path().join("gamma/garden.yml"),
        "apiVersion: garden.io/v0\nkind: Module\ntype: exec\nname: gamma\ninclude: []\nspec:\n  services:\n    - name: svc-gamma\n      dependencies: []\n      host: \"host=${runtime.services.ghost.outputs.addr}\"\n",
    )
    .unwrap();

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let plan = project.plan(ActionRequest::new(Command::Deploy).with_force(true)).unwrap();
    let result = plan.execute(ExecuteOptions::default()).await;

    assert!(!result.report.is_success());
    let key = TaskKey::new(NodeKind::Deploy, "svc-gamma");
    match &result.report.outcomes[&key] {
        NodeState::Failed(message) => assert!(
            message.contains("Unable to resolve one or more runtime template values for service 'svc-gamma': ${runtime.services.ghost.outputs.addr}"),
            "unexpected message: {message}"
        ),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn publish_skips_modules_with_allow_publish_false() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("garden.yml"), PROJECT_YAML).unwrap();
    fs::create_dir(dir.path().join("alpha")).unwrap();
    fs::write(dir.path().join("alpha/garden.yml"), ALPHA_YAML).unwrap();
    fs::create_dir(dir.path().join("internal")).unwrap();
    fs::write(
        dir.path().join("internal/garden.yml"),
        "apiVersion: garden.io/v0\nkind: Module\ntype: exec\nname: internal\ninclude: []\nallowPublish: false\nspec: {}\n",
    )
    .unwrap();

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let plan = project.plan(ActionRequest::new(Command::Publish).with_force(true).with_force_build(true)).unwrap();
    let result = plan.execute(ExecuteOptions::default()).await;

    assert!(result.report.is_success());
    let keys: Vec<TaskKey> = result.report.outcomes.keys().cloned().collect();
    assert!(keys.contains(&TaskKey::new(NodeKind::Publish, "alpha")));
    assert!(!keys.contains(&TaskKey::new(NodeKind::Publish, "internal")));
}

#[tokio::test]
async fn delete_runs_without_pulling_in_a_build() {
    let dir = tempfile::tempdir().unwrap();
    write_alpha_beta_project(dir.path());

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let plan = project.plan(ActionRequest::new(Command::Delete).with_name_filter("svc-alpha").with_force(true)).unwrap();
    let result = plan.execute(ExecuteOptions::default()).await;

    assert!(result.report.is_success());
    let keys: Vec<TaskKey> = result.report.outcomes.keys().cloned().collect();
    assert_eq!(keys, vec![TaskKey::new(NodeKind::Delete, "svc-alpha")]);
}

#[test]
fn local_module_with_copy_dependency_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("garden.yml"), PROJECT_YAML).unwrap();
    fs::create_dir(dir.path().join("base")).unwrap();
    fs::write(
        dir.path().join("base/garden.yml"),
        "apiVersion: garden.io/v0\nkind: Module\ntype: exec\nname: base\ninclude: []\nspec: {}\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("worker")).unwrap();
    fs::write(
        dir.path().join("worker/garden.yml"),
        "apiVersion: garden.io/v0\nkind: Module\ntype: exec\nname: worker\ninclude: []\nlocal: true\nspec: {}\nbuild:\n  dependencies:\n    - name: base\n      copy:\n        - source: bin\n          target: bin\n",
    )
    .unwrap();

    let mut registry = PluginRegistry::new();
    registry.register(exec_plugin()).unwrap();

    let err = Project::discover(dir.path(), registry).unwrap_err();
    match err {
        CoreError::Module(errors) => {
            assert!(errors.iter().any(|e| matches!(e, ModuleError::LocalModuleHasCopy { module } if module == "worker")))
        }
        other => panic!("expected CoreError::Module, got {other:?}"),
    }
}

#[test]
fn provider_inherits_handlers_through_base_chain() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("garden.yml"),
        "apiVersion: garden.io/v0\nkind: Project\nname: demo\ndefaultEnvironment: local\nproviders:\n  - name: cloud-child\n",
    )
    .unwrap();

    let mut base = PluginDescriptor::new("cloud-base");
    base.provider_handlers.insert(
        "getEnvironmentStatus".to_string(),
        Arc::new(HandlerEntry::leaf(Arc::new(|_params| Ok(json!({ "ready": true, "outputs": { "region": "us-east-1" } }))))),
    );
    let child = PluginDescriptor::new("cloud-child").with_base("cloud-base");

    let mut registry = PluginRegistry::new();
    registry.register(base).unwrap();
    registry.register(child).unwrap();

    let project = Project::discover(dir.path(), registry).unwrap();
    let provider = project.providers.iter().find(|p| p.name == "cloud-child").unwrap();
    assert!(provider.status.ready);
    assert_eq!(provider.status.outputs.get("region"), Some(&json!("us-east-1")));
}
