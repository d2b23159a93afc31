use std::sync::Arc;

use garden_plugin::{
    HandlerEntry, HandlerTable, ModuleTypeDef, ModuleTypeExtension, PluginDescriptor, PluginRegistry, RegistryError,
};
use garden_schema::Schema;
use serde_json::json;

fn noop_handlers(actions: &[&str]) -> HandlerTable {
    let mut table = HandlerTable::new();
    for action in actions {
        table.insert(
            action.to_string(),
            Arc::new(HandlerEntry::leaf(Arc::new(|_params| Ok(json!({}))))),
        );
    }
    table
}

#[test]
fn resolves_independent_plugins_in_declaration_order() {
    let mut registry = PluginRegistry::new();
    registry.register(PluginDescriptor::new("plugin-a")).unwrap();
    registry.register(PluginDescriptor::new("plugin-b")).unwrap();

    let resolved = registry.resolve().unwrap();
    let names: Vec<_> = resolved.plugins.iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["plugin-a".to_string(), "plugin-b".to_string()]);
}

#[test]
fn dependency_order_places_dependency_first() {
    let mut registry = PluginRegistry::new();
    registry
        .register(PluginDescriptor::new("plugin-b").with_dependency("plugin-a"))
        .unwrap();
    registry.register(PluginDescriptor::new("plugin-a")).unwrap();

    let resolved = registry.resolve().unwrap();
    let names: Vec<_> = resolved.plugins.iter().map(|p| p.name.clone()).collect();
    assert_eq!(names, vec!["plugin-a".to_string(), "plugin-b".to_string()]);
}

#[test]
fn base_chain_flattens_handlers_with_super_link() {
    let mut registry = PluginRegistry::new();
    let mut base = PluginDescriptor::new("base-plugin");
    base.provider_handlers = noop_handlers(&["configureProvider"]);
    registry.register(base).unwrap();

    let mut child = PluginDescriptor::new("child-plugin").with_base("base-plugin");
    child.provider_handlers = noop_handlers(&["configureProvider"]);
    registry.register(child).unwrap();

    let resolved = registry.resolve().unwrap();
    let child_plugin = resolved.plugins.iter().find(|p| p.name == "child-plugin").unwrap();
    let entry = &child_plugin.provider_handlers["configureProvider"];
    assert!(entry.super_handler.is_some());
}

#[test]
fn missing_base_is_reported() {
    let mut registry = PluginRegistry::new();
    registry
        .register(PluginDescriptor::new("child-plugin").with_base("ghost"))
        .unwrap();

    let errors = registry.resolve().unwrap_err();
    assert!(matches!(&errors[0], RegistryError::MissingBase { plugin, base } if plugin == "child-plugin" && base == "ghost"));
}

#[test]
fn circular_bases_are_reported() {
    let mut registry = PluginRegistry::new();
    registry.register(PluginDescriptor::new("plugin-a").with_base("plugin-b")).unwrap();
    registry.register(PluginDescriptor::new("plugin-b").with_base("plugin-a")).unwrap();

    let errors = registry.resolve().unwrap_err();
    assert!(matches!(&errors[0], RegistryError::CircularBases { .. }));
}

#[test]
fn circular_dependencies_are_reported() {
    let mut registry = PluginRegistry::new();
    registry.register(PluginDescriptor::new("plugin-a").with_dependency("plugin-b")).unwrap();
    registry.register(PluginDescriptor::new("plugin-b").with_dependency("plugin-a")).unwrap();

    let errors = registry.resolve().unwrap_err();
    assert!(matches!(&errors[0], RegistryError::CircularDeps { .. }));
}

#[test]
fn multiple_creators_of_the_same_type_is_rejected() {
    let mut registry = PluginRegistry::new();
    let module_type = || ModuleTypeDef {
        name: "container".to_string(),
        schema: Schema::any(),
        docs: String::new(),
        handlers: HandlerTable::new(),
    };
    registry
        .register(PluginDescriptor::new("plugin-a").with_module_type(module_type()))
        .unwrap();
    registry
        .register(PluginDescriptor::new("plugin-b").with_module_type(module_type()))
        .unwrap();

    let errors = registry.resolve().unwrap_err();
    assert!(matches!(&errors[0], RegistryError::MultipleCreators { type_name, .. } if type_name == "container"));
}

#[test]
fn extend_without_declare_is_rejected() {
    let mut registry = PluginRegistry::new();
    registry
        .register(
            PluginDescriptor::new("plugin-a").with_module_type_extension(ModuleTypeExtension {
                name: "container".to_string(),
                handlers: HandlerTable::new(),
                schema: None,
            }),
        )
        .unwrap();

    let errors = registry.resolve().unwrap_err();
    assert!(matches!(&errors[0], RegistryError::ExtendWithoutDeclare { type_name, .. } if type_name == "container"));
}

#[test]
fn extend_without_dependency_is_rejected() {
    let mut registry = PluginRegistry::new();
    registry
        .register(PluginDescriptor::new("creator-plugin").with_module_type(ModuleTypeDef {
            name: "container".to_string(),
            schema: Schema::any(),
            docs: String::new(),
            handlers: HandlerTable::new(),
        }))
        .unwrap();
    registry
        .register(
            PluginDescriptor::new("extender-plugin").with_module_type_extension(ModuleTypeExtension {
                name: "container".to_string(),
                handlers: HandlerTable::new(),
                schema: None,
            }),
        )
        .unwrap();

    let errors = registry.resolve().unwrap_err();
    assert!(matches!(&errors[0], RegistryError::ExtendWithoutDep { creator, .. } if creator == "creator-plugin"));
}

#[test]
fn extend_with_declared_dependency_succeeds_and_overlays_handlers() {
    let mut registry = PluginRegistry::new();
    registry
        .register(PluginDescriptor::new("creator-plugin").with_module_type(ModuleTypeDef {
            name: "container".to_string(),
            schema: Schema::any(),
            docs: String::new(),
            handlers: noop_handlers(&["build"]),
        }))
        .unwrap();
    registry
        .register(
            PluginDescriptor::new("extender-plugin")
                .with_dependency("creator-plugin")
                .with_module_type_extension(ModuleTypeExtension {
                    name: "container".to_string(),
                    handlers: noop_handlers(&["build", "deploy"]),
                    schema: None,
                }),
        )
        .unwrap();

    let resolved = registry.resolve().unwrap();
    let container = &resolved.module_types["container"];
    assert!(container.handlers["build"].super_handler.is_some());
    assert!(container.handlers.contains_key("deploy"));
}
