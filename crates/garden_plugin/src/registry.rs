//! Plugin registry: descriptor collection, `base`-chain flattening,
//! dependency merging, and topological ordering.

use std::collections::{BTreeMap, BTreeSet};

use garden_schema::Schema;

use crate::descriptor::PluginDescriptor;
use crate::error::RegistryError;
use crate::handler::{Handler, HandlerTable, overlay};

/// A module type after its creator's and every extender's handlers have
/// been folded together.
pub struct ResolvedModuleType {
    /// The type's name.
    pub name: String,
    /// The creating plugin's config schema for this type.
    pub schema: Schema,
    /// The creating plugin's documentation for this type.
    pub docs: String,
    /// Lifecycle handlers, with extensions overlaid on the creator's own
    /// (leaf wins, `super` links walk back toward the creator).
    pub handlers: HandlerTable,
    /// The plugin that created this type.
    pub creator: String,
    /// Every schema a module config of this type must satisfy: the
    /// creator's schema first, then each extender's own schema (if any), in
    /// plugin dependency order.
    pub schema_chain: Vec<Schema>,
}

/// A contributed named command, surviving resolution unchanged.
#[derive(Clone)]
pub struct ResolvedCommand {
    /// The command's name.
    pub name: String,
    /// The plugin that contributed it.
    pub plugin: String,
    /// The command's handler.
    pub handler: Handler,
}

/// A plugin after `base`-chain flattening, ready to be built in dependency
/// order.
#[derive(Clone)]
pub struct ResolvedPlugin {
    /// The plugin's name.
    pub name: String,
    /// Dependencies merged across the `base` chain, de-duplicated,
    /// preserving first-seen order.
    pub dependencies: Vec<String>,
    /// Provider-action handlers, `base`-chain flattened (leaf wins, with
    /// `super` links).
    pub provider_handlers: HandlerTable,
    /// This plugin's own config schema, if any (not inherited from `base`:
    /// each plugin instance is configured against its own schema).
    pub config_schema: Option<Schema>,
    /// Every schema in this plugin's `base` chain, root first, leaf
    /// (this plugin's own schema) last. A configured value must satisfy
    /// every schema in this list.
    pub schema_chain: Vec<Schema>,
}

/// Output of [`PluginRegistry::resolve`].
pub struct ResolvedRegistry {
    /// Plugins in dependency order: every plugin appears after all of its
    /// dependencies.
    pub plugins: Vec<ResolvedPlugin>,
    /// Every module type created by a loaded plugin, keyed by name.
    pub module_types: BTreeMap<String, ResolvedModuleType>,
    /// Every named command contributed by a loaded plugin.
    pub commands: Vec<ResolvedCommand>,
}

/// Collects plugin descriptors and resolves them into a dependency-ordered,
/// `base`-chain-flattened registry.
#[derive(Default)]
pub struct PluginRegistry {
    descriptors: BTreeMap<String, PluginDescriptor>,
    order: Vec<String>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin descriptor.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> Result<(), RegistryError> {
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicatePlugin { name: descriptor.name });
        }
        self.order.push(descriptor.name.clone());
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Resolves every registered plugin: flattens `base` inheritance, merges
    /// dependencies and module types, and topologically sorts the result.
    ///
    /// Every failure found is collected rather than stopping at the first.
    pub fn resolve(self) -> Result<ResolvedRegistry, Vec<RegistryError>> {
        let mut errors = Vec::new();

        for descriptor in self.descriptors.values() {
            if let Some(base) = &descriptor.base
                && !self.descriptors.contains_key(base)
            {
                errors.push(RegistryError::MissingBase {
                    plugin: descriptor.name.clone(),
                    base: base.clone(),
                });
            }
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        if let Some(cycle) = find_base_cycle(&self.descriptors) {
            errors.push(RegistryError::CircularBases { cycle });
            return Err(errors);
        }

        let mut creators: BTreeMap<String, String> = BTreeMap::new();
        for descriptor in self.descriptors.values() {
            for module_type in &descriptor.module_types {
                if let Some(first) = creators.get(&module_type.name) {
                    errors.push(RegistryError::MultipleCreators {
                        type_name: module_type.name.clone(),
                        first: first.clone(),
                        second: descriptor.name.clone(),
                    });
                } else {
                    creators.insert(module_type.name.clone(), descriptor.name.clone());
                }
            }
        }

        let flattened: BTreeMap<String, (HandlerTable, Vec<String>, Vec<Schema>)> = self
            .order
            .iter()
            .map(|name| (name.clone(), flatten_chain(name, &self.descriptors)))
            .collect();

        for descriptor in self.descriptors.values() {
            let merged_deps = &flattened[&descriptor.name].1;
            for extension in &descriptor.module_type_extensions {
                let Some(creator) = creators.get(&extension.name) else {
                    errors.push(RegistryError::ExtendWithoutDeclare {
                        plugin: descriptor.name.clone(),
                        type_name: extension.name.clone(),
                    });
                    continue;
                };
                if creator != &descriptor.name && !merged_deps.contains(creator) {
                    errors.push(RegistryError::ExtendWithoutDep {
                        plugin: descriptor.name.clone(),
                        type_name: extension.name.clone(),
                        creator: creator.clone(),
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let sorted = match topological_sort(&self.order, &flattened) {
            Ok(sorted) => sorted,
            Err(cycle) => return Err(vec![RegistryError::CircularDeps { cycle }]),
        };

        let mut module_types: BTreeMap<String, ResolvedModuleType> = BTreeMap::new();
        for descriptor in self.descriptors.values() {
            for module_type in &descriptor.module_types {
                module_types.insert(
                    module_type.name.clone(),
                    ResolvedModuleType {
                        name: module_type.name.clone(),
                        schema: module_type.schema.clone(),
                        docs: module_type.docs.clone(),
                        handlers: module_type.handlers.clone(),
                        creator: descriptor.name.clone(),
                        schema_chain: vec![module_type.schema.clone()],
                    },
                );
            }
        }
        for plugin_name in &sorted {
            let descriptor = &self.descriptors[plugin_name];
            for extension in &descriptor.module_type_extensions {
                if let Some(resolved) = module_types.get_mut(&extension.name) {
                    resolved.handlers = overlay(&resolved.handlers, &extension.handlers);
                    if let Some(schema) = &extension.schema {
                        resolved.schema_chain.push(schema.clone());
                    }
                }
            }
        }

        let mut commands = Vec::new();
        for plugin_name in &sorted {
            let descriptor = &self.descriptors[plugin_name];
            for command in &descriptor.commands {
                commands.push(ResolvedCommand {
                    name: command.name.clone(),
                    plugin: plugin_name.clone(),
                    handler: command.handler.clone(),
                });
            }
        }

        let plugins = sorted
            .into_iter()
            .map(|name| {
                let (provider_handlers, dependencies, schema_chain) = flattened[&name].clone();
                ResolvedPlugin {
                    config_schema: self.descriptors[&name].config_schema.clone(),
                    name,
                    dependencies,
                    provider_handlers,
                    schema_chain,
                }
            })
            .collect();

        Ok(ResolvedRegistry {
            plugins,
            module_types,
            commands,
        })
    }
}

fn find_base_cycle(descriptors: &BTreeMap<String, PluginDescriptor>) -> Option<Vec<String>> {
    for start in descriptors.keys() {
        let mut trail = vec![start.clone()];
        let mut current = start.clone();
        while let Some(base) = &descriptors[&current].base {
            if let Some(pos) = trail.iter().position(|n| n == base) {
                let mut cycle = trail[pos..].to_vec();
                cycle.push(base.clone());
                return Some(cycle);
            }
            trail.push(base.clone());
            current = base.clone();
        }
    }
    None
}

/// Returns `(merged_provider_handlers, merged_dependencies, schema_chain)`
/// for `name`, flattened root-to-leaf across its `base` chain.
fn flatten_chain(
    name: &str,
    descriptors: &BTreeMap<String, PluginDescriptor>,
) -> (HandlerTable, Vec<String>, Vec<Schema>) {
    let mut chain = Vec::new();
    let mut current = Some(name.to_string());
    while let Some(plugin_name) = current {
        let descriptor = &descriptors[&plugin_name];
        chain.push(plugin_name.clone());
        current = descriptor.base.clone();
    }
    chain.reverse();

    let mut handlers = HandlerTable::new();
    let mut dependencies = Vec::new();
    let mut seen_deps = BTreeSet::new();
    let mut schema_chain = Vec::new();
    for plugin_name in &chain {
        let descriptor = &descriptors[plugin_name];
        handlers = overlay(&handlers, &descriptor.provider_handlers);
        for dep in &descriptor.dependencies {
            if seen_deps.insert(dep.clone()) {
                dependencies.push(dep.clone());
            }
        }
        if let Some(schema) = &descriptor.config_schema {
            schema_chain.push(schema.clone());
        }
    }
    (handlers, dependencies, schema_chain)
}

fn topological_sort(
    order: &[String],
    flattened: &BTreeMap<String, (HandlerTable, Vec<String>, Vec<Schema>)>,
) -> Result<Vec<String>, Vec<String>> {
    let mut resolved = Vec::new();
    let mut resolved_set = BTreeSet::new();
    let mut visiting = Vec::new();

    fn visit(
        name: &str,
        flattened: &BTreeMap<String, (HandlerTable, Vec<String>, Vec<Schema>)>,
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
        if let Some((_, deps, _)) = flattened.get(name) {
            for dep in deps {
                visit(dep, flattened, resolved, resolved_set, visiting)?;
            }
        }
        visiting.pop();
        resolved_set.insert(name.to_string());
        resolved.push(name.to_string());
        Ok(())
    }

    for name in order {
        visit(name, flattened, &mut resolved, &mut resolved_set, &mut visiting)?;
    }
    Ok(resolved)
}
