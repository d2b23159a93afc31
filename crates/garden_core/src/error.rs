//! The aggregate project-level error, wrapping every subsystem's own.

use garden_action::ActionError;
use garden_config_store::ConfigStoreError;
use garden_graph::GraphError;
use garden_hasher::HasherError;
use garden_module::ModuleError;
use garden_plugin::RegistryError;
use garden_provider::ProviderError;
use garden_scheduler::SchedulerError;

fn join<T: ToString>(errors: &[T]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// A stable failure category every [`CoreError`] variant maps to, so a
/// caller can branch on what went wrong without matching every subsystem's
/// own enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or contradictory configuration: bad YAML, an unknown
    /// module type, a schema violation, a missing project document.
    Configuration,
    /// A dependency (build, service, task, test, or provider) could not be
    /// resolved or formed a cycle.
    Dependency,
    /// A plugin handler returned an error or an invalid result.
    Plugin,
    /// Failure while running dispatched work: a build, deploy, task, or
    /// test failed, was skipped, timed out, or was cancelled.
    Runtime,
}

/// The aggregate error type for every operation [`crate::Project`] and
/// [`crate::TaskGraph`] expose.
///
/// Each subsystem's own error collection is carried unchanged (most
/// subsystems report every error found, not just the first); use
/// [`CoreError::kind`] to classify the failure regardless of which
/// subsystem raised it. `Vec<_>` variants are converted with a plain
/// `From` impl below rather than `#[from]`, since `source()` would
/// otherwise need `Vec<_>` itself to implement `std::error::Error`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Plugin registry resolution failed.
    #[error("plugin registry: {}", join(.0))]
    Registry(Vec<RegistryError>),

    /// Project discovery or module configuration failed.
    #[error("module configuration: {}", join(.0))]
    Module(Vec<ModuleError>),

    /// Provider resolution failed.
    #[error("provider resolution: {}", join(.0))]
    Provider(Vec<ProviderError>),

    /// Config graph construction failed.
    #[error("config graph: {}", join(.0))]
    Graph(Vec<GraphError>),

    /// Task graph construction failed.
    #[error("task graph: {}", join(.0))]
    Scheduler(Vec<SchedulerError>),

    /// Action dispatch failed.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The config store could not be read or written.
    #[error(transparent)]
    ConfigStore(#[from] ConfigStoreError),

    /// Version hashing failed.
    #[error(transparent)]
    Hasher(#[from] HasherError),

    /// `environment_name` was not given and no project document declares a
    /// `defaultEnvironment`.
    #[error("no project document found under '{root}' and no environment name was given")]
    NoEnvironment {
        /// The project root that was scanned.
        root: String,
    },

    /// An action's target does not resolve to a known graph entity.
    #[error("unknown {target_kind} '{target_name}'")]
    UnknownTarget {
        /// The target's kind: module, service, task, test, or provider.
        target_kind: &'static str,
        /// The target's name.
        target_name: String,
    },

    /// An [`crate::ActionRequest`]'s `name_filter` was not a valid glob
    /// pattern.
    #[error("invalid name filter pattern '{pattern}': {source}")]
    InvalidNameFilter {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob error.
        #[source]
        source: globset::Error,
    },
}

impl From<Vec<RegistryError>> for CoreError {
    fn from(errors: Vec<RegistryError>) -> Self {
        CoreError::Registry(errors)
    }
}

impl From<Vec<ModuleError>> for CoreError {
    fn from(errors: Vec<ModuleError>) -> Self {
        CoreError::Module(errors)
    }
}

impl From<Vec<ProviderError>> for CoreError {
    fn from(errors: Vec<ProviderError>) -> Self {
        CoreError::Provider(errors)
    }
}

impl From<Vec<GraphError>> for CoreError {
    fn from(errors: Vec<GraphError>) -> Self {
        CoreError::Graph(errors)
    }
}

impl From<Vec<SchedulerError>> for CoreError {
    fn from(errors: Vec<SchedulerError>) -> Self {
        CoreError::Scheduler(errors)
    }
}

impl CoreError {
    /// This error's stable failure category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Registry(_)
            | CoreError::Module(_)
            | CoreError::ConfigStore(_)
            | CoreError::Hasher(_)
            | CoreError::NoEnvironment { .. }
            | CoreError::UnknownTarget { .. }
            | CoreError::InvalidNameFilter { .. } => ErrorKind::Configuration,
            CoreError::Provider(_) | CoreError::Graph(_) => ErrorKind::Dependency,
            CoreError::Action(_) => ErrorKind::Plugin,
            CoreError::Scheduler(_) => ErrorKind::Runtime,
        }
    }
}
