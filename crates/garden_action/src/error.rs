//! Errors raised while routing or dispatching an action call.

/// Errors produced by [`crate::dispatch`].
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The target (module, service, task, test, or provider) does not exist
    /// in the config graph or registry.
    #[error("{target_kind} '{target_name}' is not part of the project")]
    UnknownTarget {
        /// The target's kind.
        target_kind: &'static str,
        /// The target's name.
        target_name: String,
    },

    /// No handler was found for the action, and no `defaultHandler` was
    /// supplied.
    #[error("no handler found for action '{action_type}' on {target_kind} '{target_name}'")]
    NoHandler {
        /// The requested action type.
        action_type: String,
        /// The target's kind.
        target_kind: &'static str,
        /// The target's name.
        target_name: String,
    },

    /// The runtime template pass left one or more `${runtime.*}` references
    /// unresolved even with the provided runtime context.
    #[error("Unable to resolve one or more runtime template values for {target_kind} '{target_name}': {}", .expressions.join(", "))]
    UnresolvedRuntimeReference {
        /// The target's kind.
        target_kind: &'static str,
        /// The target's name.
        target_name: String,
        /// Every unresolved `${runtime.*}` expression found, verbatim.
        expressions: Vec<String>,
    },

    /// The handler itself returned an error.
    #[error(transparent)]
    Handler(#[from] garden_plugin::HandlerError),
}
