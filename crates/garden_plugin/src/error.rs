//! Failure modes of plugin registry resolution.

/// Errors produced by [`crate::PluginRegistry::resolve`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    /// Two plugins declared the same name.
    #[error("plugin '{name}' is registered more than once")]
    DuplicatePlugin {
        /// The repeated plugin name.
        name: String,
    },

    /// A `base` referenced a plugin that was never registered.
    #[error("plugin '{plugin}' declares base '{base}', which is not registered")]
    MissingBase {
        /// The plugin declaring the missing base.
        plugin: String,
        /// The base name that could not be found.
        base: String,
    },

    /// The `base` chain contains a cycle.
    #[error("circular base chain: {}", .cycle.join(" -> "))]
    CircularBases {
        /// The full cycle, in traversal order, repeating the start at the end.
        cycle: Vec<String>,
    },

    /// The `dependencies` graph contains a cycle.
    #[error("circular plugin dependency: {}", .cycle.join(" -> "))]
    CircularDeps {
        /// The full cycle, in traversal order, repeating the start at the end.
        cycle: Vec<String>,
    },

    /// A module type was created by two unrelated plugins.
    #[error("module type '{type_name}' is created by both '{first}' and '{second}'")]
    MultipleCreators {
        /// The contested module type name.
        type_name: String,
        /// The plugin that created it first.
        first: String,
        /// The second plugin that also claims to create it.
        second: String,
    },

    /// A plugin extended a module type that no loaded plugin creates.
    #[error("plugin '{plugin}' extends module type '{type_name}', which no loaded plugin creates")]
    ExtendWithoutDeclare {
        /// The extending plugin.
        plugin: String,
        /// The undeclared module type name.
        type_name: String,
    },

    /// A plugin extended a module type without depending on its creator.
    #[error(
        "plugin '{plugin}' extends module type '{type_name}' created by '{creator}', but does not depend on '{creator}'"
    )]
    ExtendWithoutDep {
        /// The extending plugin.
        plugin: String,
        /// The extended module type name.
        type_name: String,
        /// The plugin that created the type.
        creator: String,
    },
}
