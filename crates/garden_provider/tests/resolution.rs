use std::collections::BTreeMap;
use std::sync::Arc;

use garden_plugin::{Handler, HandlerEntry, HandlerTable, ResolvedPlugin};
use garden_provider::{ProviderDeclaration, ProviderError, resolve_providers};
use serde_json::json;

fn bare_plugin(name: &str) -> ResolvedPlugin {
    ResolvedPlugin {
        name: name.to_string(),
        dependencies: Vec::new(),
        provider_handlers: HandlerTable::new(),
        config_schema: None,
        schema_chain: Vec::new(),
    }
}

fn handler(f: impl Fn(&serde_json::Value) -> Result<serde_json::Value, garden_plugin::HandlerError> + Send + Sync + 'static) -> Handler {
    Arc::new(f)
}

#[test]
fn resolves_independent_providers() {
    let mut plugins = BTreeMap::new();
    plugins.insert("test-a".to_string(), bare_plugin("test-a"));

    let declared = vec![ProviderDeclaration {
        name: "test-a".to_string(),
        environment: None,
        config: json!({}),
    }];

    let resolved = resolve_providers(&declared, &plugins, &json!({}), "local", false).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].name, "test-a");
    assert!(resolved[0].status.ready);
}

#[test]
fn implicit_dependency_via_output_reference_orders_correctly() {
    let mut a_handlers = HandlerTable::new();
    a_handlers.insert(
        "getEnvironmentStatus".to_string(),
        Arc::new(HandlerEntry::leaf(handler(|_| Ok(json!({ "ready": true, "outputs": { "host": "localhost" } }))))),
    );
    let mut plugin_a = bare_plugin("test-a");
    plugin_a.provider_handlers = a_handlers;

    let plugin_b = bare_plugin("test-b");

    let mut plugins = BTreeMap::new();
    plugins.insert("test-a".to_string(), plugin_a);
    plugins.insert("test-b".to_string(), plugin_b);

    let declared = vec![
        ProviderDeclaration {
            name: "test-b".to_string(),
            environment: None,
            config: json!({ "host": "${providers.test-a.outputs.host}" }),
        },
        ProviderDeclaration {
            name: "test-a".to_string(),
            environment: None,
            config: json!({}),
        },
    ];

    let resolved = resolve_providers(&declared, &plugins, &json!({}), "local", false).unwrap();
    let names: Vec<_> = resolved.iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["test-a".to_string(), "test-b".to_string()]);

    let provider_b = resolved.iter().find(|p| p.name == "test-b").unwrap();
    assert_eq!(provider_b.config["host"], json!("localhost"));
}

#[test]
fn circular_implicit_dependency_is_reported() {
    let plugin_a = bare_plugin("test-a");
    let plugin_b = bare_plugin("test-b");

    let mut plugins = BTreeMap::new();
    plugins.insert("test-a".to_string(), plugin_a);
    plugins.insert("test-b".to_string(), plugin_b);

    let declared = vec![
        ProviderDeclaration {
            name: "test-a".to_string(),
            environment: None,
            config: json!({ "x": "${providers.test-b.outputs.foo}" }),
        },
        ProviderDeclaration {
            name: "test-b".to_string(),
            environment: None,
            config: json!({ "x": "${providers.test-a.outputs.foo}" }),
        },
    ];

    let errors = resolve_providers(&declared, &plugins, &json!({}), "local", false).unwrap_err();
    assert!(matches!(&errors[0], ProviderError::CircularDependency { .. }));
}

#[test]
fn environment_restricted_provider_is_skipped() {
    let mut plugins = BTreeMap::new();
    plugins.insert("test-a".to_string(), bare_plugin("test-a"));

    let declared = vec![ProviderDeclaration {
        name: "test-a".to_string(),
        environment: Some(vec!["production".to_string()]),
        config: json!({}),
    }];

    let resolved = resolve_providers(&declared, &plugins, &json!({}), "local", false).unwrap();
    assert!(resolved.is_empty());
}

#[test]
fn not_ready_after_preparation_is_an_error() {
    let mut handlers = HandlerTable::new();
    handlers.insert(
        "getEnvironmentStatus".to_string(),
        Arc::new(HandlerEntry::leaf(handler(|_| Ok(json!({ "ready": false, "outputs": {} }))))),
    );
    handlers.insert(
        "prepareEnvironment".to_string(),
        Arc::new(HandlerEntry::leaf(handler(|_| Ok(json!({}))))),
    );
    let mut plugin_a = bare_plugin("test-a");
    plugin_a.provider_handlers = handlers;

    let mut plugins = BTreeMap::new();
    plugins.insert("test-a".to_string(), plugin_a);

    let declared = vec![ProviderDeclaration {
        name: "test-a".to_string(),
        environment: None,
        config: json!({}),
    }];

    let errors = resolve_providers(&declared, &plugins, &json!({}), "local", false).unwrap_err();
    assert!(matches!(&errors[0], ProviderError::NotReady { provider } if provider == "test-a"));
}
