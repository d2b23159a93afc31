//! Resolves a project's raw module documents into configured, versioned
//! [`ModuleConfig`]s, in build-dependency order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use garden_config_store::ConfigStore;
use garden_hasher::compute_version;
use garden_plugin::{ResolvedModuleType, ResolvedRegistry};
use garden_schema::validate_all;
use garden_template::{Pass, resolve_value};
use serde_json::{Value, json};

use crate::document::ModuleDocument;
use crate::error::ModuleError;
use crate::module::ModuleConfig;
use crate::remote::{RepositoryCheckout, resolve_remote_root};

/// Configures every module in `raw_modules`, in an order where each module
/// appears after every module its `build.dependencies` name.
///
/// `raw_modules` pairs a module's declared directory (where its `garden.yml`
/// lives) with its parsed document. `dotignore_files` and `project_variables`
/// come from the project document; `cache_root` is the project's `.garden`
/// directory.
pub fn configure_modules(
    raw_modules: Vec<(PathBuf, ModuleDocument)>,
    registry: &ResolvedRegistry,
    project_variables: &Value,
    environment_name: &str,
    dotignore_files: &[String],
    cache_root: &Path,
    config_store: &ConfigStore,
    checkout: Option<&dyn RepositoryCheckout>,
) -> Result<Vec<ModuleConfig>, Vec<ModuleError>> {
    let mut errors = Vec::new();

    let mut by_name: BTreeMap<String, (PathBuf, ModuleDocument)> = BTreeMap::new();
    for (dir, doc) in raw_modules {
        if let Some((first_dir, _)) = by_name.get(&doc.name) {
            errors.push(ModuleError::DuplicateModule {
                name: doc.name.clone(),
                first_path: first_dir.display().to_string(),
                second_path: dir.display().to_string(),
            });
            continue;
        }
        by_name.insert(doc.name.clone(), (dir, doc));
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let names: BTreeSet<String> = by_name.keys().cloned().collect();
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (name, (_, doc)) in &by_name {
        if !registry.module_types.contains_key(&doc.module_type) {
            errors.push(ModuleError::UnknownModuleType {
                module: name.clone(),
                type_name: doc.module_type.clone(),
            });
        }
        if doc.local && doc.build.dependencies.iter().any(|dep| !dep.copy.is_empty()) {
            errors.push(ModuleError::LocalModuleHasCopy { module: name.clone() });
        }
        let mut deps = BTreeSet::new();
        for dep in &doc.build.dependencies {
            if names.contains(&dep.name) {
                deps.insert(dep.name.clone());
            } else {
                errors.push(ModuleError::MissingBuildDependency {
                    module: name.clone(),
                    dependency: dep.name.clone(),
                });
            }
        }
        edges.insert(name.clone(), deps);
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let order = match topological_sort(&names, &edges) {
        Ok(order) => order,
        Err(cycle) => return Err(vec![ModuleError::CircularBuildDependency { cycle }]),
    };

    let mut configured: BTreeMap<String, ModuleConfig> = BTreeMap::new();
    let mut results = Vec::new();

    for name in order {
        let (declared_dir, doc) = by_name.remove(&name).expect("module was in the name set");

        let module_root = match &doc.repository_url {
            Some(url) => match resolve_remote_root(&name, url, cache_root, config_store, checkout) {
                Ok(path) => path,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            },
            None => declared_dir,
        };

        let Some(module_type) = registry.module_types.get(&doc.module_type) else {
            continue;
        };

        let modules_context: BTreeMap<String, Value> = configured
            .iter()
            .map(|(n, m)| {
                (
                    n.clone(),
                    json!({ "version": m.version.version_string, "outputs": m.outputs }),
                )
            })
            .collect();
        let context = json!({
            "variables": project_variables,
            "environment": { "name": environment_name },
            "modules": modules_context,
        });

        let templatable = json!({ "spec": doc.spec, "env": doc.env });
        let resolved_templatable = match resolve_value(&templatable, &context, Pass::Static) {
            Ok(value) => value,
            Err(source) => {
                errors.push(ModuleError::Template { module: name.clone(), source });
                continue;
            }
        };
        let resolved_spec = resolved_templatable.get("spec").cloned().unwrap_or(Value::Null);
        let resolved_env = resolved_templatable.get("env").cloned().unwrap_or(Value::Null);

        let schema_refs: Vec<_> = module_type.schema_chain.iter().collect();
        let validated_spec = if schema_refs.is_empty() {
            resolved_spec
        } else {
            match validate_all(&schema_refs, &resolved_spec) {
                Ok(value) => value,
                Err(schema_errors) => {
                    errors.push(ModuleError::SchemaValidation { module: name.clone(), errors: schema_errors });
                    continue;
                }
            }
        };

        let configure_input = json!({
            "name": name,
            "path": module_root.display().to_string(),
            "spec": validated_spec,
            "tasks": doc.tasks,
            "tests": doc.tests,
        });

        let configured_result = match invoke_configure(&name, module_type, &configure_input, &validated_spec, &doc) {
            Ok(result) => result,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };

        let mut dependency_versions = BTreeMap::new();
        for dep_name in &doc.build.dependencies {
            if let Some(dep) = configured.get(&dep_name.name) {
                dependency_versions.insert(dep_name.name.clone(), dep.version.version_string.clone());
            }
        }

        let version = match compute_version(&module_root, &doc.include, &doc.exclude, dotignore_files, dependency_versions) {
            Ok(version) => version,
            Err(source) => {
                errors.push(ModuleError::Version { module: name.clone(), source });
                continue;
            }
        };

        let module_config = ModuleConfig {
            api_version: doc.api_version.clone(),
            module_type: doc.module_type.clone(),
            name: name.clone(),
            path: module_root,
            repository_url: doc.repository_url.clone(),
            include: doc.include.clone(),
            exclude: doc.exclude.clone(),
            allow_publish: doc.allow_publish,
            local: doc.local,
            env: resolved_env,
            build: doc.build.clone(),
            spec: configured_result.spec,
            service_configs: configured_result.service_configs,
            task_configs: configured_result.task_configs,
            test_configs: configured_result.test_configs,
            outputs: configured_result.outputs,
            version,
        };

        configured.insert(name.clone(), module_config.clone());
        results.push(module_config);
    }

    if errors.is_empty() { Ok(results) } else { Err(errors) }
}

/// The parts of a `configure` handler's result this resolver cares about.
struct ConfigureResult {
    spec: Value,
    service_configs: Vec<Value>,
    task_configs: Vec<Value>,
    test_configs: Vec<Value>,
    outputs: Value,
}

fn invoke_configure(
    name: &str,
    module_type: &ResolvedModuleType,
    configure_input: &Value,
    fallback_spec: &Value,
    doc: &ModuleDocument,
) -> Result<ConfigureResult, ModuleError> {
    let Some(entry) = module_type.handlers.get("configure") else {
        return Ok(ConfigureResult {
            spec: fallback_spec.clone(),
            service_configs: Vec::new(),
            task_configs: doc.tasks.clone(),
            test_configs: doc.tests.clone(),
            outputs: Value::Null,
        });
    };
    let result = entry.call(configure_input).map_err(|source| ModuleError::Configure {
        module: name.to_string(),
        source,
    })?;
    let spec = result.get("spec").cloned().unwrap_or_else(|| fallback_spec.clone());
    let service_configs = result.get("serviceConfigs").and_then(Value::as_array).cloned().unwrap_or_default();
    let mut task_configs = doc.tasks.clone();
    task_configs.extend(result.get("taskConfigs").and_then(Value::as_array).cloned().unwrap_or_default());
    let mut test_configs = doc.tests.clone();
    test_configs.extend(result.get("testConfigs").and_then(Value::as_array).cloned().unwrap_or_default());
    let outputs = result.get("outputs").cloned().unwrap_or(Value::Null);
    Ok(ConfigureResult { spec, service_configs, task_configs, test_configs, outputs })
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
