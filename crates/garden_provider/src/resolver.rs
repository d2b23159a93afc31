//! Builds the provider dependency DAG and processes providers in
//! topological order.

use std::collections::{BTreeMap, BTreeSet};

use garden_plugin::ResolvedPlugin;
use garden_schema::validate_all;
use garden_template::{Pass, find_placeholders, resolve_value};
use serde_json::Value;

use crate::error::ProviderError;
use crate::provider::{Provider, ProviderDeclaration, ProviderStatus};

/// Resolves every declared provider that applies to `environment_name`,
/// in dependency order.
///
/// `force_init` disables the `ready` short-circuit: `prepareEnvironment` is
/// invoked even if `getEnvironmentStatus` already reports readiness.
pub fn resolve_providers(
    declared: &[ProviderDeclaration],
    plugins: &BTreeMap<String, ResolvedPlugin>,
    project_variables: &Value,
    environment_name: &str,
    force_init: bool,
) -> Result<Vec<Provider>, Vec<ProviderError>> {
    let active: Vec<&ProviderDeclaration> = declared
        .iter()
        .filter(|p| p.environment.as_ref().is_none_or(|envs| envs.iter().any(|e| e == environment_name)))
        .collect();

    let mut errors = Vec::new();
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let active_names: BTreeSet<String> = active.iter().map(|p| p.name.clone()).collect();

    for provider in &active {
        let Some(plugin) = plugins.get(&provider.name) else {
            errors.push(ProviderError::UnknownPlugin { provider: provider.name.clone() });
            continue;
        };
        let mut deps: BTreeSet<String> = BTreeSet::new();
        for dep in &plugin.dependencies {
            if active_names.contains(dep) {
                deps.insert(dep.clone());
            } else if plugins.contains_key(dep) {
                // Declared dependency on a plugin whose provider is not
                // active in this environment: not an error, simply not an edge.
            } else {
                errors.push(ProviderError::MissingDependency {
                    provider: provider.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        for placeholder in collect_placeholders(&provider.config) {
            if placeholder.path.first().map(String::as_str) == Some("providers")
                && let Some(dep_name) = placeholder.path.get(1)
                && active_names.contains(dep_name)
            {
                deps.insert(dep_name.clone());
            }
        }
        edges.insert(provider.name.clone(), deps);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let order = match topological_sort(&active_names, &edges) {
        Ok(order) => order,
        Err(cycle) => return Err(vec![ProviderError::CircularDependency { cycle }]),
    };

    let mut outputs_context: BTreeMap<String, Value> = BTreeMap::new();
    let mut resolved = Vec::new();

    for name in order {
        let declaration = active.iter().find(|p| p.name == name).expect("provider was in active set");
        let plugin = &plugins[&name];
        let dependencies: Vec<String> = edges[&name].iter().cloned().collect();

        let context = serde_json::json!({
            "providers": outputs_context.iter().map(|(n, v)| (n.clone(), serde_json::json!({ "outputs": v }))).collect::<BTreeMap<_, _>>(),
            "variables": project_variables,
            "environment": { "name": environment_name },
        });

        let resolved_config = match resolve_value(&declaration.config, &context, Pass::Static) {
            Ok(value) => value,
            Err(source) => {
                errors.push(ProviderError::Template { provider: name.clone(), source });
                continue;
            }
        };

        let schema_refs: Vec<_> = plugin.schema_chain.iter().collect();
        let validated_config = if schema_refs.is_empty() {
            resolved_config
        } else {
            match validate_all(&schema_refs, &resolved_config) {
                Ok(value) => value,
                Err(schema_errors) => {
                    errors.push(ProviderError::SchemaValidation { provider: name.clone(), errors: schema_errors });
                    continue;
                }
            }
        };

        let (configured, module_configs) = match invoke_configure(&name, plugin, &validated_config) {
            Ok(result) => result,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        let revalidated = if schema_refs.is_empty() {
            configured
        } else {
            match validate_all(&schema_refs, &configured) {
                Ok(value) => value,
                Err(schema_errors) => {
                    errors.push(ProviderError::SchemaValidation { provider: name.clone(), errors: schema_errors });
                    continue;
                }
            }
        };

        let status = match settle_environment(&name, plugin, &revalidated, force_init) {
            Ok(status) => status,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        outputs_context.insert(name.clone(), serde_json::json!(status.outputs));

        resolved.push(Provider {
            name,
            config: revalidated,
            dependencies,
            module_configs,
            status,
        });
    }

    if errors.is_empty() { Ok(resolved) } else { Err(errors) }
}

fn invoke_configure(
    name: &str,
    plugin: &ResolvedPlugin,
    config: &Value,
) -> Result<(Value, Vec<Value>), ProviderError> {
    let Some(entry) = plugin.provider_handlers.get("configureProvider") else {
        return Ok((config.clone(), Vec::new()));
    };
    let result = entry.call(config).map_err(|source| ProviderError::HandlerFailed {
        provider: name.to_string(),
        handler: "configureProvider".to_string(),
        source,
    })?;
    let config_out = result.get("config").cloned().unwrap_or_else(|| config.clone());
    let module_configs = result
        .get("moduleConfigs")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok((config_out, module_configs))
}

fn settle_environment(
    name: &str,
    plugin: &ResolvedPlugin,
    config: &Value,
    force_init: bool,
) -> Result<ProviderStatus, ProviderError> {
    let mut status = query_status(name, plugin, config)?;

    if !status.ready || force_init {
        if let Some(entry) = plugin.provider_handlers.get("prepareEnvironment") {
            entry.call(config).map_err(|source| ProviderError::HandlerFailed {
                provider: name.to_string(),
                handler: "prepareEnvironment".to_string(),
                source,
            })?;
            status = query_status(name, plugin, config)?;
        }
    }

    if !status.ready {
        return Err(ProviderError::NotReady { provider: name.to_string() });
    }
    Ok(status)
}

fn query_status(name: &str, plugin: &ResolvedPlugin, config: &Value) -> Result<ProviderStatus, ProviderError> {
    let Some(entry) = plugin.provider_handlers.get("getEnvironmentStatus") else {
        return Ok(ProviderStatus { ready: true, outputs: BTreeMap::new() });
    };
    let result = entry.call(config).map_err(|source| ProviderError::HandlerFailed {
        provider: name.to_string(),
        handler: "getEnvironmentStatus".to_string(),
        source,
    })?;
    let ready = result.get("ready").and_then(Value::as_bool).ok_or_else(|| ProviderError::InvalidHandlerResult {
        provider: name.to_string(),
        handler: "getEnvironmentStatus".to_string(),
        reason: "missing boolean 'ready' field".to_string(),
    })?;
    let outputs = result
        .get("outputs")
        .and_then(Value::as_object)
        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();
    Ok(ProviderStatus { ready, outputs })
}

fn collect_placeholders(value: &Value) -> Vec<garden_template::Placeholder> {
    let mut found = Vec::new();
    walk(value, &mut found);
    found
}

fn walk(value: &Value, found: &mut Vec<garden_template::Placeholder>) {
    match value {
        Value::String(s) => found.extend(find_placeholders(s)),
        Value::Array(items) => items.iter().for_each(|item| walk(item, found)),
        Value::Object(map) => map.values().for_each(|item| walk(item, found)),
        _ => {}
    }
}

fn topological_sort(
    names: &BTreeSet<String>,
    edges: &BTreeMap<String, BTreeSet<String>>,
) -> Result<Vec<String>, Vec<String>> {
    let mut resolved = Vec::new();
    let mut resolved_set = BTreeSet::new();
    let mut visiting = Vec::new();

    fn visit(
        name: &str,
        edges: &BTreeMap<String, BTreeSet<String>>,
        resolved: &mut Vec<String>,
        resolved_set: &mut BTreeSet<String>,
        visiting: &mut Vec<String>,
    ) -> Result<(), Vec<String>> {
        if resolved_set.contains(name) {
            return Ok(());
        }
        if let Some(pos) = visiting.iter().position(|n| n == name) {
            let mut cycle = visiting[pos..].to_vec();
            cycle.push(name.to_string());
            return Err(cycle);
        }
        visiting.push(name.to_string());
        if let Some(deps) = edges.get(name) {
            for dep in deps {
                visit(dep, edges, resolved, resolved_set, visiting)?;
            }
        }
        visiting.pop();
        resolved_set.insert(name.to_string());
        resolved.push(name.to_string());
        Ok(())
    }

    for name in names {
        visit(name, edges, &mut resolved, &mut resolved_set, &mut visiting)?;
    }
    Ok(resolved)
}
