//! Errors raised while discovering and configuring modules.

use std::path::PathBuf;

use garden_hasher::HasherError;
use garden_plugin::HandlerError;
use garden_schema::SchemaError;
use garden_template::TemplateError;

/// Errors produced by [`crate::discover_modules`] and [`crate::configure_module`].
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// Two `garden.yml` files declared a module with the same name.
    #[error("duplicate module name '{name}': declared in both {first_path} and {second_path}")]
    DuplicateModule {
        /// The repeated module name.
        name: String,
        /// The file that declared it first.
        first_path: String,
        /// The file that declared it again.
        second_path: String,
    },

    /// A directory contains both a `garden.yml` and a `garden.yaml` file.
    #[error("directory '{directory}' has both a garden.yml and a garden.yaml file")]
    DuplicateExtension {
        /// The offending directory.
        directory: String,
    },

    /// More than one `Project` document was found in the project.
    #[error("multiple project documents found: {first_path} and {second_path}")]
    MultipleProjectDocuments {
        /// The first project document found.
        first_path: String,
        /// A later, conflicting project document.
        second_path: String,
    },

    /// A `garden.yml` could not be parsed as YAML.
    #[error("failed to parse {path} as YAML: {source}")]
    Yaml {
        /// The offending file.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Walking the project directory tree failed.
    #[error("failed to scan {path} for module configs: {source}")]
    Walk {
        /// The directory being scanned.
        path: String,
        /// The underlying walker error.
        #[source]
        source: ignore::Error,
    },

    /// A discovery `include`/`exclude` glob pattern was invalid.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: globset::Error,
    },

    /// A module declares a type no loaded plugin creates.
    #[error("module '{module}' has unknown type '{type_name}'")]
    UnknownModuleType {
        /// The module declaring the unknown type.
        module: String,
        /// The undeclared type name.
        type_name: String,
    },

    /// A module's `build.dependencies` names a module that was never
    /// configured.
    #[error("module '{module}' depends on unknown build dependency '{dependency}'")]
    MissingBuildDependency {
        /// The module declaring the dependency.
        module: String,
        /// The undeclared dependency.
        dependency: String,
    },

    /// A `local: true` module declared a build-dependency file copy, which
    /// local-exec modules may not do.
    #[error("local module '{module}' may not declare build-dependency file copies")]
    LocalModuleHasCopy {
        /// The offending module.
        module: String,
    },

    /// The combined build-dependency graph has a cycle.
    #[error("circular build dependency: {}", .cycle.join(" -> "))]
    CircularBuildDependency {
        /// The full cycle, repeating the start at the end.
        cycle: Vec<String>,
    },

    /// Static template resolution of a module's fields failed.
    #[error("failed to resolve templates in module '{module}': {source}")]
    Template {
        /// The module whose config failed to resolve.
        module: String,
        /// The underlying template error.
        #[source]
        source: TemplateError,
    },

    /// A module's `spec` did not satisfy its type's schema chain.
    #[error("module '{module}' config is invalid: {errors:?}")]
    SchemaValidation {
        /// The module that failed validation.
        module: String,
        /// Every validation failure found.
        errors: Vec<SchemaError>,
    },

    /// The creating plugin's `configure` handler failed.
    #[error("module '{module}' failed to configure: {source}")]
    Configure {
        /// The module being configured.
        module: String,
        /// The underlying handler error.
        #[source]
        source: HandlerError,
    },

    /// Version hashing for a module failed.
    #[error("failed to compute version for module '{module}': {source}")]
    Version {
        /// The module being versioned.
        module: String,
        /// The underlying hasher error.
        #[source]
        source: HasherError,
    },

    /// Checking out a remote module's repository failed.
    #[error("failed to check out remote module '{module}' from '{url}': {reason}")]
    RemoteCheckout {
        /// The module being checked out.
        module: String,
        /// The repository URL.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The linked-path/config-store lookup failed.
    #[error("config store error: {0}")]
    ConfigStore(#[from] garden_config_store::ConfigStoreError),

    /// A provider's `configureProvider` handler returned a module config
    /// (via `moduleConfigs`) that does not parse as a module document.
    #[error("provider '{provider}' contributed an invalid module config: {source}")]
    ProviderModuleConfig {
        /// The provider that contributed the config.
        provider: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}
