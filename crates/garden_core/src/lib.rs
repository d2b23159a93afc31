//! The aggregate project-level API: discovers a project (plugins, providers,
//! modules, the config graph), plans a task graph for a lifecycle action,
//! and runs it.
//!
//! ```no_run
//! # async fn run() -> Result<(), garden_core::CoreError> {
//! use garden_core::{ActionRequest, Command, ExecuteOptions, Project};
//! use garden_plugin::PluginRegistry;
//! use std::path::Path;
//!
//! let project = Project::discover(Path::new("."), PluginRegistry::default())?;
//! let plan = project.plan(ActionRequest::new(Command::Build))?;
//! let result = plan.execute(ExecuteOptions::default()).await;
//! assert!(result.report.is_success());
//! # Ok(())
//! # }
//! ```

mod environment;
mod error;
mod plan;
mod project;

pub use error::{CoreError, ErrorKind};
pub use plan::{ActionRequest, Command, ExecuteOptions, ExecuteResult, TaskGraph};
pub use project::{DiscoverOptions, Project};
