//! Errors raised while building or querying the config graph.

/// Errors produced by [`crate::build_graph`] and the [`crate::ConfigGraph`]
/// query API.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A service/task/test config was missing a required field.
    #[error("module '{module}' declared an entity missing required field '{field}'")]
    MissingField {
        /// The module that declared the malformed entity.
        module: String,
        /// The missing field's name.
        field: String,
    },

    /// Two entities of the same kind share a name.
    #[error("duplicate {kind} name '{name}': declared by both module '{first_module}' and module '{second_module}'")]
    DuplicateEntity {
        /// The entity kind (`service`, `task`, or `test`).
        kind: &'static str,
        /// The repeated name.
        name: String,
        /// The module that declared it first.
        first_module: String,
        /// The module that declared it again.
        second_module: String,
    },

    /// An entity's `dependencies` names a service or task that was never
    /// declared.
    #[error("{kind} '{name}' depends on unknown entity '{dependency}'")]
    UnknownDependency {
        /// The dependent entity's kind.
        kind: &'static str,
        /// The dependent entity's name.
        name: String,
        /// The undeclared dependency name.
        dependency: String,
    },

    /// A module's `build.dependencies` names a module the graph does not
    /// know about. The module configurator already validates this; this
    /// variant guards against a graph built from inconsistent inputs.
    #[error("module '{module}' depends on unknown build dependency '{dependency}'")]
    UnknownBuildDependency {
        /// The dependent module.
        module: String,
        /// The undeclared dependency.
        dependency: String,
    },

    /// A cycle exists within a single edge label (`build`, `service`,
    /// `task`, or `test`).
    #[error("circular {label} dependency: {}", .cycle.join(" -> "))]
    LabelCycle {
        /// The edge label the cycle was found under.
        label: &'static str,
        /// The full cycle, repeating the start at the end.
        cycle: Vec<String>,
    },

    /// The union of all edge labels contains a cycle not visible within any
    /// single label (e.g. a build dependency closing a loop opened by a
    /// service dependency).
    #[error("circular dependency across the combined graph: {}", .cycle.join(" -> "))]
    UnionCycle {
        /// The full cycle, repeating the start at the end.
        cycle: Vec<String>,
    },
}
