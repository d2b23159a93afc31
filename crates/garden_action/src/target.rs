//! What an action call names: a module, service, task, test, or provider.

/// The entity an action call is directed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTarget {
    /// A module-level action, e.g. `build`, `configure`.
    Module(String),
    /// A service-level action, e.g. `deployService`, `getServiceStatus`.
    Service(String),
    /// A task-level action, e.g. `runTask`, `getTaskResult`.
    Task(String),
    /// A test-level action, e.g. `testModule`, `getTestResult`. Tests are
    /// only unique within their declaring module.
    Test {
        /// The test's declaring module.
        module: String,
        /// The test's own name.
        name: String,
    },
    /// A provider-level action, e.g. `configureProvider`, `getSecret`.
    Provider(String),
}

impl ActionTarget {
    /// The target's kind and display name, for error messages.
    #[must_use]
    pub fn describe(&self) -> (&'static str, String) {
        match self {
            ActionTarget::Module(name) => ("module", name.clone()),
            ActionTarget::Service(name) => ("service", name.clone()),
            ActionTarget::Task(name) => ("task", name.clone()),
            ActionTarget::Test { module, name } => ("test", format!("{module}.{name}")),
            ActionTarget::Provider(name) => ("provider", name.clone()),
        }
    }
}
