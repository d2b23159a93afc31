//! Plugin registry: loads plugin descriptors, flattens `base` inheritance,
//! merges dependencies and module type declarations, and topologically
//! orders the result.

mod descriptor;
mod error;
mod handler;
mod registry;

pub use descriptor::{CommandDef, ModuleTypeDef, ModuleTypeExtension, PluginDescriptor};
pub use error::RegistryError;
pub use handler::{Handler, HandlerEntry, HandlerError, HandlerTable, overlay};
pub use registry::{PluginRegistry, ResolvedCommand, ResolvedModuleType, ResolvedPlugin, ResolvedRegistry};
