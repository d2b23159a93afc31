//! The fully configured, resolved module: the output of this crate.

use std::path::PathBuf;

use garden_hasher::ModuleVersion;
use serde_json::Value;

use crate::document::BuildSpec;

/// A module after static template resolution, schema validation, the
/// `configure` handler, and version assignment.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    /// Document schema version.
    pub api_version: String,
    /// The module's type; must be created by some loaded plugin.
    pub module_type: String,
    /// Globally unique module name.
    pub name: String,
    /// The directory this module's source is read from (the declared
    /// directory, a config-store-linked local path, or a remote-module
    /// cache directory).
    pub path: PathBuf,
    /// The remote repository this module's source came from, if any.
    pub repository_url: Option<String>,
    /// Source-file globs, resolved.
    pub include: Vec<String>,
    /// Source-file exclusion globs, resolved.
    pub exclude: Vec<String>,
    /// Whether this module may be published.
    pub allow_publish: bool,
    /// Whether this is a local-exec module.
    pub local: bool,
    /// Environment variables exposed to this module's handlers, after
    /// static template resolution. Consulted by the runtime context builder
    /// alongside a target's own `env`.
    pub env: Value,
    /// Build dependencies and staging command, resolved.
    pub build: BuildSpec,
    /// The module type's own configuration fields, after defaults and
    /// validation, and after the `configure` handler has run.
    pub spec: Value,
    /// Service configs synthesized by the `configure` handler.
    pub service_configs: Vec<Value>,
    /// Task configs synthesized by the `configure` handler, merged with any
    /// declared directly in the module document.
    pub task_configs: Vec<Value>,
    /// Test configs synthesized by the `configure` handler, merged with any
    /// declared directly in the module document.
    pub test_configs: Vec<Value>,
    /// Outputs synthesized by the `configure` handler, available to
    /// templates as `${modules.<name>.outputs.<key>}`.
    pub outputs: Value,
    /// The module's computed content-addressed version.
    pub version: ModuleVersion,
}
