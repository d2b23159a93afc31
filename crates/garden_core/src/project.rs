//! The project-level aggregate: discovery wires plugin resolution through
//! provider resolution and module configuration into a ready [`ConfigGraph`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use garden_config_store::ConfigStore;
use garden_graph::{ConfigGraph, build_graph};
use garden_module::{ModuleDocument, RepositoryCheckout, load_project};
use garden_plugin::{PluginRegistry, ResolvedPlugin, ResolvedRegistry};
use garden_provider::{Provider, ProviderDeclaration, resolve_providers};
use serde_json::Value;

use crate::environment::{merge_variables, resolve_environment_name};
use crate::error::CoreError;

/// Options controlling a [`Project::discover`] run.
///
/// `environment` overrides the project document's `defaultEnvironment`;
/// `force_init` disables the `getEnvironmentStatus` ready short-circuit for
/// every provider, forcing `prepareEnvironment` to run regardless; `checkout`
/// is consulted for any module declaring a `repositoryUrl`.
#[derive(Default)]
pub struct DiscoverOptions {
    /// The active environment name. Defaults to the project's
    /// `defaultEnvironment` when absent.
    pub environment: Option<String>,
    /// Forces `prepareEnvironment` even when providers report ready.
    pub force_init: bool,
    /// Checks out remote (`repositoryUrl`) modules. With no checkout given,
    /// a project containing remote modules fails discovery once resolution
    /// reaches them.
    pub checkout: Option<Arc<dyn RepositoryCheckout>>,
}

/// A discovered, fully resolved project: every plugin loaded, every
/// provider ready, every module configured and versioned, joined into a
/// queryable [`ConfigGraph`].
///
/// Built once by [`Project::discover`] and never mutated afterward; planning
/// and execution read from it but do not write back.
pub struct Project {
    /// The project root that was scanned.
    pub root: PathBuf,
    /// The active environment's name.
    pub environment_name: String,
    /// Project variables, with the active environment's overlay folded in.
    pub variables: Value,
    /// Every loaded plugin, dependency-ordered and `base`-chain flattened.
    ///
    /// Shared via `Arc` so [`Project::plan`] can hand each scheduled node's
    /// process closure its own cheap handle rather than borrowing `self` for
    /// the closure's (potentially much longer) lifetime.
    pub registry: Arc<ResolvedRegistry>,
    /// Every resolved, ready provider, in dependency order.
    pub providers: Vec<Provider>,
    /// The joined module/service/task/test graph, shared for the same
    /// reason as `registry`.
    pub graph: Arc<ConfigGraph>,
    /// The project's `.garden` cache directory.
    pub cache_root: PathBuf,
    /// The on-disk key-value store for linked sources and secrets.
    pub config_store: ConfigStore,
    /// Extra ignore filenames honored during module discovery and file
    /// enumeration, beyond VCS ignore files.
    pub dotignore_files: Vec<String>,
}

impl Project {
    /// Discovers and fully resolves the project rooted at `root`, using
    /// `plugins` as the available plugin set and the project's own
    /// `defaultEnvironment` with no remote checkout support.
    ///
    /// Equivalent to [`Project::discover_with`] with default options.
    pub fn discover(root: &Path, plugins: PluginRegistry) -> Result<Project, CoreError> {
        Self::discover_with(root, plugins, DiscoverOptions::default())
    }

    /// Discovers and fully resolves the project rooted at `root`, using
    /// `plugins` as the available plugin set.
    ///
    /// Runs, in order: project and module document discovery, plugin
    /// registry resolution, provider resolution, module configuration
    /// (including any module configs synthesized by a provider's
    /// `configureProvider`), and config graph construction.
    pub fn discover_with(root: &Path, plugins: PluginRegistry, options: DiscoverOptions) -> Result<Project, CoreError> {
        let loaded = load_project(root)?;

        let environment_name = resolve_environment_name(options.environment.as_deref(), loaded.document.as_ref())
            .ok_or_else(|| CoreError::NoEnvironment { root: root.display().to_string() })?
            .to_string();

        let variables = merge_variables(loaded.document.as_ref(), &environment_name);

        let registry = plugins.resolve()?;

        let declared_providers: Vec<ProviderDeclaration> = loaded
            .document
            .as_ref()
            .map(|doc| {
                doc.providers
                    .iter()
                    .map(|raw| ProviderDeclaration {
                        name: raw.name.clone(),
                        environment: raw.environment.clone(),
                        config: raw.config.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let plugins_by_name: std::collections::BTreeMap<String, ResolvedPlugin> =
            registry.plugins.iter().map(|plugin| (plugin.name.clone(), plugin.clone())).collect();

        let providers = resolve_providers(&declared_providers, &plugins_by_name, &variables, &environment_name, options.force_init)?;

        let cache_root = root.join(".garden");
        let config_store = ConfigStore::new(cache_root.join("config-store.json"));
        let dotignore_files = loaded.document.as_ref().map(|doc| doc.dot_ignore_files.clone()).unwrap_or_default();

        let mut raw_modules = loaded.modules;
        for provider in &providers {
            for raw in &provider.module_configs {
                let document: ModuleDocument = serde_json::from_value(raw.clone()).map_err(|source| {
                    CoreError::Module(vec![garden_module::ModuleError::ProviderModuleConfig { provider: provider.name.clone(), source }])
                })?;
                raw_modules.push((root.to_path_buf(), document));
            }
        }

        let checkout: Option<&dyn RepositoryCheckout> = options.checkout.as_deref();
        let modules = garden_module::configure_modules(
            raw_modules,
            &registry,
            &variables,
            &environment_name,
            &dotignore_files,
            &cache_root,
            &config_store,
            checkout,
        )?;

        let graph = build_graph(&modules)?;

        Ok(Project {
            root: root.to_path_buf(),
            environment_name,
            variables,
            registry: Arc::new(registry),
            providers,
            graph: Arc::new(graph),
            cache_root,
            config_store,
            dotignore_files,
        })
    }
}
