use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use garden_config_store::ConfigStore;
use garden_module::{ModuleDocument, ModuleError, configure_modules, load_project};
use garden_plugin::{HandlerEntry, HandlerTable, ModuleTypeDef, PluginDescriptor, PluginRegistry};
use garden_schema::Schema;
use serde_json::json;

fn container_registry() -> garden_plugin::ResolvedRegistry {
    let mut handlers = HandlerTable::new();
    handlers.insert(
        "configure".to_string(),
        Arc::new(HandlerEntry::leaf(Arc::new(|params| {
            Ok(json!({
                "spec": params["spec"],
                "outputs": { "image": format!("{}:latest", params["name"].as_str().unwrap()) },
            }))
        }))),
    );

    let mut properties = BTreeMap::new();
    properties.insert("port".to_string(), Schema::number().with_default(json!(8080)));
    let schema = Schema::object(properties, Vec::new());

    let mut registry = PluginRegistry::new();
    registry
        .register(
            PluginDescriptor::new("container-plugin").with_module_type(ModuleTypeDef {
                name: "container".to_string(),
                schema,
                docs: String::new(),
                handlers,
            }),
        )
        .unwrap();
    registry.resolve().unwrap()
}

#[test]
fn discovers_and_splits_project_and_module_documents() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("garden.yml"),
        "apiVersion: garden.io/v0\nkind: Project\nname: demo\ndefaultEnvironment: local\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("web")).unwrap();
    fs::write(
        dir.path().join("web/garden.yml"),
        "apiVersion: garden.io/v0\nkind: Module\ntype: container\nname: web\nspec: {}\n",
    )
    .unwrap();

    let loaded = load_project(dir.path()).unwrap();
    assert_eq!(loaded.document.unwrap().name, "demo");
    assert_eq!(loaded.modules.len(), 1);
    assert_eq!(loaded.modules[0].1.name, "web");
}

#[test]
fn configures_module_and_applies_schema_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let doc: ModuleDocument = serde_yaml::from_str(
        "apiVersion: garden.io/v0\nkind: Module\ntype: container\nname: web\ninclude: []\nspec: {}\n",
    )
    .unwrap();

    let registry = container_registry();
    let store = ConfigStore::new(dir.path().join("config-store.json"));

    let configured = configure_modules(
        vec![(dir.path().to_path_buf(), doc)],
        &registry,
        &json!({}),
        "local",
        &[],
        dir.path(),
        &store,
        None,
    )
    .unwrap();

    assert_eq!(configured.len(), 1);
    assert_eq!(configured[0].spec, json!({ "port": 8080 }));
    assert_eq!(configured[0].outputs, json!({ "image": "web:latest" }));
    assert!(configured[0].version.version_string.starts_with("v-"));
}

#[test]
fn build_dependency_version_is_available_to_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let base: ModuleDocument =
        serde_yaml::from_str("apiVersion: garden.io/v0\nkind: Module\ntype: container\nname: base\ninclude: []\nspec: {}\n")
            .unwrap();
    let app: ModuleDocument = serde_yaml::from_str(
        "apiVersion: garden.io/v0\nkind: Module\ntype: container\nname: app\ninclude: []\nspec: {}\nbuild:\n  dependencies:\n    - name: base\n",
    )
    .unwrap();

    let registry = container_registry();
    let store = ConfigStore::new(dir.path().join("config-store.json"));

    let configured = configure_modules(
        vec![(dir.path().to_path_buf(), base), (dir.path().to_path_buf(), app)],
        &registry,
        &json!({}),
        "local",
        &[],
        dir.path(),
        &store,
        None,
    )
    .unwrap();

    let names: Vec<_> = configured.iter().map(|m| m.name.clone()).collect();
    assert_eq!(names, vec!["base".to_string(), "app".to_string()]);
    let app_config = configured.iter().find(|m| m.name == "app").unwrap();
    assert!(app_config.version.dependency_versions.contains_key("base"));
}

#[test]
fn duplicate_module_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let first: ModuleDocument =
        serde_yaml::from_str("apiVersion: garden.io/v0\nkind: Module\ntype: container\nname: web\nspec: {}\n").unwrap();
    let second = first.clone();

    let registry = container_registry();
    let store = ConfigStore::new(dir.path().join("config-store.json"));

    let errors = configure_modules(
        vec![
            (dir.path().join("a"), first),
            (dir.path().join("b"), second),
        ],
        &registry,
        &json!({}),
        "local",
        &[],
        dir.path(),
        &store,
        None,
    )
    .unwrap_err();

    assert!(matches!(&errors[0], ModuleError::DuplicateModule { name, .. } if name == "web"));
}

#[test]
fn unknown_module_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let doc: ModuleDocument =
        serde_yaml::from_str("apiVersion: garden.io/v0\nkind: Module\ntype: mystery\nname: web\nspec: {}\n").unwrap();

    let registry = container_registry();
    let store = ConfigStore::new(dir.path().join("config-store.json"));

    let errors = configure_modules(
        vec![(dir.path().to_path_buf(), doc)],
        &registry,
        &json!({}),
        "local",
        &[],
        dir.path(),
        &store,
        None,
    )
    .unwrap_err();

    assert!(matches!(&errors[0], ModuleError::UnknownModuleType { type_name, .. } if type_name == "mystery"));
}

#[test]
fn circular_build_dependency_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let a: ModuleDocument = serde_yaml::from_str(
        "apiVersion: garden.io/v0\nkind: Module\ntype: container\nname: a\nspec: {}\nbuild:\n  dependencies:\n    - name: b\n",
    )
    .unwrap();
    let b: ModuleDocument = serde_yaml::from_str(
        "apiVersion: garden.io/v0\nkind: Module\ntype: container\nname: b\nspec: {}\nbuild:\n  dependencies:\n    - name: a\n",
    )
    .unwrap();

    let registry = container_registry();
    let store = ConfigStore::new(dir.path().join("config-store.json"));

    let errors = configure_modules(
        vec![(dir.path().to_path_buf(), a), (dir.path().to_path_buf(), b)],
        &registry,
        &json!({}),
        "local",
        &[],
        dir.path(),
        &store,
        None,
    )
    .unwrap_err();

    assert!(matches!(&errors[0], ModuleError::CircularBuildDependency { .. }));
}
