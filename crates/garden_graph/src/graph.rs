//! The config graph: modules, services, tasks, and tests joined by typed,
//! labeled dependency edges, with acyclicity enforced both per-label and
//! across their union.

use std::collections::{BTreeMap, BTreeSet};

use garden_module::ModuleConfig;

use crate::entity::{EntityKind, EntityRef, ServiceConfig, TaskConfig, TestConfig, parse_service, parse_task, parse_test};
use crate::error::GraphError;

/// A queryable module/service/task/test graph, built once per project load
/// and never mutated afterward.
#[derive(Debug, Clone, Default)]
pub struct ConfigGraph {
    modules: BTreeMap<String, ModuleConfig>,
    services: BTreeMap<String, ServiceConfig>,
    tasks: BTreeMap<String, TaskConfig>,
    /// Keyed by `<module>.<name>`: test names are only unique within their
    /// declaring module, so two modules may each declare a test named
    /// `unit` without colliding.
    tests: BTreeMap<String, TestConfig>,
    build_edges: BTreeMap<String, BTreeSet<String>>,
    entity_edges: BTreeMap<EntityRef, BTreeSet<EntityRef>>,
}

fn test_key(module: &str, name: &str) -> String {
    format!("{module}.{name}")
}

impl ConfigGraph {
    /// Looks up a module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.get(name)
    }

    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }

    /// Looks up a task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskConfig> {
        self.tasks.get(name)
    }

    /// Looks up a test by its declaring module and its own name.
    #[must_use]
    pub fn test(&self, module: &str, name: &str) -> Option<&TestConfig> {
        self.tests.get(&test_key(module, name))
    }

    /// Every module, in name order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleConfig> {
        self.modules.values()
    }

    /// Every service, in name order.
    pub fn services(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.values()
    }

    /// Every task, in name order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskConfig> {
        self.tasks.values()
    }

    /// Every test, in `<module>.<name>` key order.
    pub fn tests(&self) -> impl Iterator<Item = &TestConfig> {
        self.tests.values()
    }

    /// The name of the module that owns `entity`.
    ///
    /// For a module reference this is the module's own name; for a service,
    /// task, or test this is the module that declared it. Returns `None` if
    /// `entity` does not resolve to a known node.
    #[must_use]
    pub fn owning_module(&self, entity: &EntityRef) -> Option<&str> {
        match entity.kind {
            EntityKind::Module => self.modules.get(&entity.name).map(|m| m.name.as_str()),
            EntityKind::Service => self.services.get(&entity.name).map(|s| s.module.as_str()),
            EntityKind::Task => self.tasks.get(&entity.name).map(|t| t.module.as_str()),
            EntityKind::Test => self.tests.get(&entity.name).map(|t| t.module.as_str()),
        }
    }

    /// The direct dependencies declared by `entity`.
    ///
    /// Modules report their `build.dependencies`; services/tasks/tests
    /// report their own `dependencies` list, resolved to the service or
    /// task each name refers to.
    #[must_use]
    pub fn direct_dependencies(&self, entity: &EntityRef) -> Vec<EntityRef> {
        match entity.kind {
            EntityKind::Module => self
                .build_edges
                .get(&entity.name)
                .into_iter()
                .flatten()
                .map(|name| EntityRef::module(name.clone()))
                .collect(),
            _ => self.entity_edges.get(entity).into_iter().flatten().cloned().collect(),
        }
    }

    /// Every transitive dependency of `entity`, optionally restricted to a
    /// single edge label (`"build"`, `"service"`, `"task"`, or `"test"`).
    ///
    /// With no label filter, traversal follows every edge kind (the union
    /// graph). `entity` itself is never included in the result.
    #[must_use]
    pub fn transitive_dependencies(&self, entity: &EntityRef, label: Option<&str>) -> BTreeSet<EntityRef> {
        let mut seen = BTreeSet::new();
        let mut stack = self.direct_dependencies(entity);
        while let Some(next) = stack.pop() {
            if label.is_some_and(|l| l != next.kind.edge_label()) {
                continue;
            }
            if seen.insert(next.clone()) {
                stack.extend(self.direct_dependencies(&next));
            }
        }
        seen
    }
}

/// Builds a [`ConfigGraph`] from a project's configured modules.
///
/// Collects every error found (duplicate entity names, unknown
/// dependencies, cycles) rather than stopping at the first.
pub fn build_graph(modules: &[ModuleConfig]) -> Result<ConfigGraph, Vec<GraphError>> {
    let mut errors = Vec::new();

    let module_map: BTreeMap<String, ModuleConfig> = modules.iter().map(|m| (m.name.clone(), m.clone())).collect();

    let mut build_edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for module in modules {
        let mut deps = BTreeSet::new();
        for dep in &module.build.dependencies {
            if module_map.contains_key(&dep.name) {
                deps.insert(dep.name.clone());
            } else {
                errors.push(GraphError::UnknownBuildDependency {
                    module: module.name.clone(),
                    dependency: dep.name.clone(),
                });
            }
        }
        build_edges.insert(module.name.clone(), deps);
    }

    let mut services: BTreeMap<String, ServiceConfig> = BTreeMap::new();
    let mut tasks: BTreeMap<String, TaskConfig> = BTreeMap::new();
    let mut tests: BTreeMap<String, TestConfig> = BTreeMap::new();

    for module in modules {
        for raw in &module.service_configs {
            match parse_service(&module.name, raw) {
                Ok(service) => insert_unique(&mut services, service.name.clone(), service, "service", &mut errors),
                Err(err) => errors.push(err),
            }
        }
        for raw in &module.task_configs {
            match parse_task(&module.name, raw) {
                Ok(task) => insert_unique(&mut tasks, task.name.clone(), task, "task", &mut errors),
                Err(err) => errors.push(err),
            }
        }
        for raw in &module.test_configs {
            match parse_test(&module.name, raw) {
                Ok(test) => {
                    let key = test_key(&module.name, &test.name);
                    insert_unique(&mut tests, key, test, "test", &mut errors);
                }
                Err(err) => errors.push(err),
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut entity_edges: BTreeMap<EntityRef, BTreeSet<EntityRef>> = BTreeMap::new();
    for service in services.values() {
        let from = EntityRef::service(service.name.clone());
        let resolved = resolve_dependency_names(EntityKind::Service, &service.name, &service.dependencies, &services, &tasks, &mut errors);
        entity_edges.insert(from, resolved);
    }
    for task in tasks.values() {
        let from = EntityRef::task(task.name.clone());
        let resolved = resolve_dependency_names(EntityKind::Task, &task.name, &task.dependencies, &services, &tasks, &mut errors);
        entity_edges.insert(from, resolved);
    }
    for test in tests.values() {
        let from = EntityRef::test(test_key(&test.module, &test.name));
        let resolved = resolve_dependency_names(EntityKind::Test, &test.name, &test.dependencies, &services, &tasks, &mut errors);
        entity_edges.insert(from, resolved);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    for label in ["build", "service", "task", "test"] {
        if let Some(cycle) = find_label_cycle(label, &build_edges, &entity_edges) {
            errors.push(GraphError::LabelCycle { label, cycle });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    if let Some(cycle) = find_union_cycle(&build_edges, &entity_edges) {
        errors.push(GraphError::UnionCycle { cycle });
        return Err(errors);
    }

    Ok(ConfigGraph { modules: module_map, services, tasks, tests, build_edges, entity_edges })
}

fn insert_unique<T>(map: &mut BTreeMap<String, T>, key: String, value: T, kind: &'static str, errors: &mut Vec<GraphError>)
where
    T: HasModule,
{
    if let Some(existing) = map.get(&key) {
        errors.push(GraphError::DuplicateEntity {
            kind,
            name: key,
            first_module: existing.owning_module().to_string(),
            second_module: value.owning_module().to_string(),
        });
    } else {
        map.insert(key, value);
    }
}

trait HasModule {
    fn owning_module(&self) -> &str;
}
impl HasModule for ServiceConfig {
    fn owning_module(&self) -> &str {
        &self.module
    }
}
impl HasModule for TaskConfig {
    fn owning_module(&self) -> &str {
        &self.module
    }
}
impl HasModule for TestConfig {
    fn owning_module(&self) -> &str {
        &self.module
    }
}

fn resolve_dependency_names(
    kind: EntityKind,
    name: &str,
    dependencies: &[String],
    services: &BTreeMap<String, ServiceConfig>,
    tasks: &BTreeMap<String, TaskConfig>,
    errors: &mut Vec<GraphError>,
) -> BTreeSet<EntityRef> {
    let mut resolved = BTreeSet::new();
    for dep in dependencies {
        if services.contains_key(dep) {
            resolved.insert(EntityRef::service(dep.clone()));
        } else if tasks.contains_key(dep) {
            resolved.insert(EntityRef::task(dep.clone()));
        } else {
            errors.push(GraphError::UnknownDependency { kind: kind.edge_label(), name: name.to_string(), dependency: dep.clone() });
        }
    }
    resolved
}

fn find_label_cycle(
    label: &'static str,
    build_edges: &BTreeMap<String, BTreeSet<String>>,
    entity_edges: &BTreeMap<EntityRef, BTreeSet<EntityRef>>,
) -> Option<Vec<String>> {
    if label == "build" {
        let adjacency: BTreeMap<String, BTreeSet<String>> = build_edges.clone();
        return find_cycle(adjacency.keys().cloned().collect(), |n| adjacency.get(n).cloned().unwrap_or_default());
    }
    let nodes: Vec<String> = entity_edges.keys().filter(|e| e.kind.edge_label() == label).map(EntityRef::to_string).collect();
    let adjacency: BTreeMap<String, BTreeSet<String>> = entity_edges
        .iter()
        .filter(|(from, _)| from.kind.edge_label() == label)
        .map(|(from, deps)| (from.to_string(), deps.iter().map(EntityRef::to_string).collect()))
        .collect();
    find_cycle(nodes, |n| adjacency.get(n).cloned().unwrap_or_default())
}

fn find_union_cycle(
    build_edges: &BTreeMap<String, BTreeSet<String>>,
    entity_edges: &BTreeMap<EntityRef, BTreeSet<EntityRef>>,
) -> Option<Vec<String>> {
    let mut adjacency: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (from, deps) in build_edges {
        let key = EntityRef::module(from.clone()).to_string();
        adjacency.entry(key).or_default().extend(deps.iter().map(|d| EntityRef::module(d.clone()).to_string()));
    }
    for (from, deps) in entity_edges {
        adjacency.entry(from.to_string()).or_default().extend(deps.iter().map(EntityRef::to_string));
    }
    let nodes: Vec<String> = adjacency.keys().cloned().collect();
    find_cycle(nodes, |n| adjacency.get(n).cloned().unwrap_or_default())
}

fn find_cycle(nodes: Vec<String>, neighbors: impl Fn(&str) -> BTreeSet<String>) -> Option<Vec<String>> {
    let mut visited = BTreeSet::new();
    let mut visiting = Vec::new();

    fn visit(
        node: &str,
        neighbors: &impl Fn(&str) -> BTreeSet<String>,
        visited: &mut BTreeSet<String>,
        visiting: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        if visited.contains(node) {
            return None;
        }
        if let Some(pos) = visiting.iter().position(|n| n == node) {
            let mut cycle = visiting[pos..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        visiting.push(node.to_string());
        for next in neighbors(node) {
            if let Some(cycle) = visit(&next, neighbors, visited, visiting) {
                return Some(cycle);
            }
        }
        visiting.pop();
        visited.insert(node.to_string());
        None
    }

    for node in nodes {
        if let Some(cycle) = visit(&node, &neighbors, &mut visited, &mut visiting) {
            return Some(cycle);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use garden_hasher::ModuleVersion;
    use garden_module::{BuildDependency, BuildSpec, ModuleConfig};
    use serde_json::json;

    use super::*;

    fn module(name: &str, build_deps: &[&str]) -> ModuleConfig {
        ModuleConfig {
            api_version: "garden.io/v0".to_string(),
            module_type: "exec".to_string(),
            name: name.to_string(),
            path: PathBuf::from(name),
            repository_url: None,
            include: vec![],
            exclude: vec![],
            allow_publish: true,
            local: false,
            env: json!({}),
            build: BuildSpec {
                dependencies: build_deps
                    .iter()
                    .map(|d| BuildDependency { name: (*d).to_string(), copy: vec![] })
                    .collect(),
                command: None,
            },
            spec: json!({}),
            service_configs: vec![],
            task_configs: vec![],
            test_configs: vec![],
            outputs: json!({}),
            version: ModuleVersion { version_string: "v-0000000000".to_string(), dependency_versions: BTreeMap::new(), files: vec![] },
        }
    }

    fn service(name: &str, deps: &[&str]) -> Value {
        json!({ "name": name, "dependencies": deps })
    }

    fn task(name: &str, deps: &[&str]) -> Value {
        json!({ "name": name, "dependencies": deps, "timeout": 60 })
    }

    #[test]
    fn builds_a_simple_build_graph() {
        let mut a = module("a", &[]);
        let b = module("b", &["a"]);
        a.service_configs = vec![service("web", &[])];
        let modules = vec![a, b];
        let graph = build_graph(&modules).expect("graph builds");
        assert!(graph.module("a").is_some());
        assert!(graph.service("web").is_some());
        let deps = graph.transitive_dependencies(&EntityRef::module("b"), Some("build"));
        assert!(deps.contains(&EntityRef::module("a")));
    }

    #[test]
    fn rejects_unknown_build_dependency() {
        let modules = vec![module("a", &["missing"])];
        let errors = build_graph(&modules).expect_err("should fail");
        assert!(matches!(errors[0], GraphError::UnknownBuildDependency { .. }));
    }

    #[test]
    fn rejects_duplicate_service_names() {
        let mut a = module("a", &[]);
        let mut b = module("b", &[]);
        a.service_configs = vec![service("web", &[])];
        b.service_configs = vec![service("web", &[])];
        let modules = vec![a, b];
        let errors = build_graph(&modules).expect_err("should fail");
        assert!(matches!(errors[0], GraphError::DuplicateEntity { kind: "service", .. }));
    }

    #[test]
    fn rejects_unknown_entity_dependency() {
        let mut a = module("a", &[]);
        a.service_configs = vec![service("web", &["ghost"])];
        let modules = vec![a];
        let errors = build_graph(&modules).expect_err("should fail");
        assert!(matches!(errors[0], GraphError::UnknownDependency { .. }));
    }

    #[test]
    fn detects_build_cycle() {
        let a = module("a", &["b"]);
        let b = module("b", &["a"]);
        let modules = vec![a, b];
        let errors = build_graph(&modules).expect_err("should fail");
        assert!(matches!(errors[0], GraphError::LabelCycle { label: "build", .. }));
    }

    #[test]
    fn detects_union_cycle_across_service_and_task() {
        let mut a = module("a", &[]);
        a.service_configs = vec![service("web", &["job"])];
        a.task_configs = vec![task("job", &["web"])];
        let modules = vec![a];
        let errors = build_graph(&modules).expect_err("should fail");
        assert!(errors.iter().any(|e| matches!(e, GraphError::UnionCycle { .. })));
    }

    #[test]
    fn tests_are_namespaced_per_module() {
        let mut a = module("a", &[]);
        let mut c = module("c", &[]);
        a.test_configs = vec![json!({ "name": "unit", "dependencies": [] })];
        c.test_configs = vec![json!({ "name": "unit", "dependencies": [] })];
        let modules = vec![a, c];
        let graph = build_graph(&modules).expect("graph builds: tests are namespaced per module");
        assert!(graph.test("a", "unit").is_some());
        assert!(graph.test("c", "unit").is_some());
    }
}
