//! Errors raised while resolving providers.

use garden_schema::SchemaError;
use garden_template::TemplateError;

/// Errors produced by [`crate::resolve_providers`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// A provider depends on a plugin that is not declared in the project.
    #[error("provider '{provider}' depends on undeclared provider '{dependency}'")]
    MissingDependency {
        /// The dependent provider.
        provider: String,
        /// The undeclared dependency.
        dependency: String,
    },

    /// The combined declared+implicit dependency graph has a cycle.
    #[error("circular provider dependency: {}", .cycle.join(" -> "))]
    CircularDependency {
        /// The full cycle, in traversal order, repeating the start at the end.
        cycle: Vec<String>,
    },

    /// Template resolution of a provider's config failed.
    #[error("failed to resolve templates in provider '{provider}' config: {source}")]
    Template {
        /// The provider whose config failed to resolve.
        provider: String,
        /// Underlying template error.
        #[source]
        source: TemplateError,
    },

    /// The provider's config did not satisfy its plugin's schema chain.
    #[error("provider '{provider}' config is invalid: {errors:?}")]
    SchemaValidation {
        /// The provider whose config failed validation.
        provider: String,
        /// Every validation failure found.
        errors: Vec<SchemaError>,
    },

    /// The project references a provider whose plugin was never loaded.
    #[error("provider '{provider}' has no corresponding loaded plugin")]
    UnknownPlugin {
        /// The provider name.
        provider: String,
    },

    /// `prepareEnvironment` ran but the provider never reported `ready=true`.
    #[error("provider '{provider}' environment is not ready after preparation")]
    NotReady {
        /// The provider that failed to become ready.
        provider: String,
    },

    /// A handler invocation returned a value that could not be interpreted.
    #[error("provider '{provider}' handler '{handler}' returned an invalid result: {reason}")]
    InvalidHandlerResult {
        /// The provider being resolved.
        provider: String,
        /// The handler action name.
        handler: String,
        /// A human-readable description of the problem.
        reason: String,
    },

    /// A handler invocation itself failed.
    #[error("provider '{provider}' handler '{handler}' failed: {source}")]
    HandlerFailed {
        /// The provider being resolved.
        provider: String,
        /// The handler action name.
        handler: String,
        /// Underlying handler error.
        #[source]
        source: garden_plugin::HandlerError,
    },
}
