//! Raw YAML document shapes, as written by project authors.
//!
//! These mirror `garden.yml` on disk field-for-field (camelCase keys) and
//! carry no resolved state; [`crate::configure::configure_module`] turns a
//! [`ModuleDocument`] plus its surrounding context into a [`crate::ModuleConfig`].

use serde::Deserialize;
use serde_json::Value;

/// A single `garden.yml` document: either the one project-level document at
/// the project root, or one of possibly several module documents.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum GardenDocument {
    /// `kind: Project`.
    Project(ProjectDocument),
    /// `kind: Module`.
    Module(ModuleDocument),
}

/// The project root's `garden.yml`, `kind: Project`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    /// Document schema version, e.g. `"garden.io/v0"`.
    pub api_version: String,
    /// The project's name.
    pub name: String,
    /// The environment used when `--env` is not given.
    pub default_environment: String,
    /// Named environments, each with its own variable overlay.
    #[serde(default)]
    pub environments: Vec<EnvironmentDef>,
    /// Declared providers, in declaration order.
    #[serde(default)]
    pub providers: Vec<RawProviderDeclaration>,
    /// Extra ignore filenames consulted during module discovery and file
    /// enumeration, beyond VCS ignore files.
    #[serde(default)]
    pub dot_ignore_files: Vec<String>,
    /// Project-level variables, available to templates as `variables.*`.
    #[serde(default)]
    pub variables: Value,
    /// Project-wide module discovery filters.
    #[serde(default)]
    pub modules: ModuleDiscoveryConfig,
}

/// A named environment and its variable overlay.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDef {
    /// The environment's name, referenced by `--env`.
    pub name: String,
    /// Variables merged over the project's own, active only in this
    /// environment.
    #[serde(default)]
    pub variables: Value,
}

/// A provider declaration as written in the project document: a plugin name,
/// an optional environment restriction, and the plugin's own config fields
/// flattened alongside them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProviderDeclaration {
    /// The provider's name; matches a loaded plugin.
    pub name: String,
    /// Restricts this provider to the listed environment names, if set.
    #[serde(default)]
    pub environment: Option<Vec<String>>,
    /// The provider's own configuration fields.
    #[serde(flatten)]
    pub config: Value,
}

/// Project-wide include/exclude globs applied during module discovery, on
/// top of VCS and dotignore rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDiscoveryConfig {
    /// Only files matching one of these globs are scanned for module
    /// documents. Empty means "everything" at the discovery stage (unlike a
    /// module's own `include`, which treats empty as "no sources").
    #[serde(default)]
    pub include: Vec<String>,
    /// Files matching any of these globs are never scanned.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A module document, `kind: Module`, as written in a `garden.yml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDocument {
    /// Document schema version, e.g. `"garden.io/v0"`.
    pub api_version: String,
    /// The module type; must be created by some loaded plugin.
    #[serde(rename = "type")]
    pub module_type: String,
    /// Globally unique module name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Globs selecting this module's source files for hashing and staging.
    /// Absent or empty means no sources.
    #[serde(default)]
    pub include: Vec<String>,
    /// Globs excluded from `include`.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// If set, this module's source lives in a remote repository rather than
    /// alongside this document.
    #[serde(default)]
    pub repository_url: Option<String>,
    /// Whether this module may be published. Defaults to `true`.
    #[serde(default = "default_true")]
    pub allow_publish: bool,
    /// Build dependencies and the staging command.
    #[serde(default)]
    pub build: BuildSpec,
    /// Whether this is a local-exec module (no build-dependency file
    /// copies permitted).
    #[serde(default)]
    pub local: bool,
    /// Environment variables exposed to this module's handlers.
    #[serde(default)]
    pub env: Value,
    /// Raw task definitions, handed to the creating plugin's `configure`
    /// handler alongside `spec`.
    #[serde(default)]
    pub tasks: Vec<Value>,
    /// Raw test definitions, handed to the creating plugin's `configure`
    /// handler alongside `spec`.
    #[serde(default)]
    pub tests: Vec<Value>,
    /// The module type's own configuration fields, validated against the
    /// creating (and extending) plugin's schema.
    #[serde(default)]
    pub spec: Value,
}

fn default_true() -> bool {
    true
}

/// A module's build dependencies and optional staging command.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    /// Other modules this module's build depends on.
    #[serde(default)]
    pub dependencies: Vec<BuildDependency>,
    /// An optional shell command run after dependency files are copied in.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

/// A single build dependency: another module's name and the files to copy
/// from its build output into this module's build directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDependency {
    /// The dependency module's name. Must resolve to a configured module.
    pub name: String,
    /// Files to copy from the dependency's build output.
    #[serde(default)]
    pub copy: Vec<CopySpec>,
}

/// A single file or directory copy from a build dependency's output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySpec {
    /// Source path, relative to the dependency's build directory.
    pub source: String,
    /// Target path, relative to this module's build directory. Defaults to
    /// `source` when absent.
    #[serde(default)]
    pub target: Option<String>,
}

/// Splits a parsed YAML file's documents into the project document (if any)
/// and its module documents, in file order.
pub fn parse_documents(contents: &str) -> Result<Vec<GardenDocument>, serde_yaml::Error> {
    serde_yaml::Deserializer::from_str(contents).map(GardenDocument::deserialize).collect()
}
