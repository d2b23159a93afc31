//! Provider declarations and resolved providers.

use std::collections::BTreeMap;

use serde_json::Value;

/// A provider as declared in the project's `garden.yml`.
#[derive(Debug, Clone)]
pub struct ProviderDeclaration {
    /// The provider's name; matches the plugin that implements it.
    pub name: String,
    /// If set, this provider is only configured when the active environment
    /// name is in this list; otherwise it is skipped entirely.
    pub environment: Option<Vec<String>>,
    /// The raw (unresolved) provider configuration.
    pub config: Value,
}

/// A provider's readiness and outputs.
#[derive(Debug, Clone, Default)]
pub struct ProviderStatus {
    /// Whether the provider's environment is ready for use.
    pub ready: bool,
    /// Outputs available to template references as
    /// `${providers.<name>.outputs.<key>}`.
    pub outputs: BTreeMap<String, Value>,
}

/// A fully resolved provider: created by [`crate::resolve_providers`] exactly
/// once per process per name, never mutated after resolution completes.
#[derive(Debug, Clone)]
pub struct Provider {
    /// The provider's name.
    pub name: String,
    /// The final, resolved and validated configuration.
    pub config: Value,
    /// Names of providers this one depends on (declared and implicit,
    /// combined).
    pub dependencies: Vec<String>,
    /// Module configs synthesized by `configureProvider`, if any.
    pub module_configs: Vec<Value>,
    /// Readiness and outputs.
    pub status: ProviderStatus,
}
