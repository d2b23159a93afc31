//! Plugin descriptors as declared by plugin authors, before resolution.

use garden_schema::Schema;

use crate::handler::{Handler, HandlerTable};

/// A module type created by a plugin: its config schema, documentation, and
/// the handlers that implement its lifecycle actions (`configure`, `build`,
/// `deploy`, ...).
pub struct ModuleTypeDef {
    /// The module type's name, e.g. `"container"`.
    pub name: String,
    /// Schema every module config of this type is validated against.
    pub schema: Schema,
    /// Documentation surfaced to users (e.g. `garden describe`-style output).
    pub docs: String,
    /// This type's own lifecycle handlers.
    pub handlers: HandlerTable,
}

/// A plugin's extension of a module type it did not create.
pub struct ModuleTypeExtension {
    /// The extended type's name. Must be created by some loaded plugin.
    pub name: String,
    /// Handlers this plugin contributes, overlaid on the creator's (and any
    /// earlier extender's) handlers.
    pub handlers: HandlerTable,
    /// An additional schema this extension's own fields must satisfy, if
    /// any. Appended to the type's schema chain, after the creator's.
    pub schema: Option<Schema>,
}

/// A named command a plugin contributes (e.g. `garden <plugin> <command>`).
pub struct CommandDef {
    /// The command's name.
    pub name: String,
    /// The command's handler.
    pub handler: Handler,
}

/// A plugin as declared, before `base`-chain flattening and dependency
/// resolution.
pub struct PluginDescriptor {
    /// Globally unique plugin name.
    pub name: String,
    /// Parent plugin name, if this plugin extends another's defaults.
    pub base: Option<String>,
    /// Plugin names this plugin depends on, in declaration order.
    pub dependencies: Vec<String>,
    /// Schema for this plugin's own provider configuration, if any.
    pub config_schema: Option<Schema>,
    /// Provider-action handlers this plugin contributes.
    pub provider_handlers: HandlerTable,
    /// Module types this plugin creates.
    pub module_types: Vec<ModuleTypeDef>,
    /// Module types this plugin extends.
    pub module_type_extensions: Vec<ModuleTypeExtension>,
    /// Named commands this plugin contributes.
    pub commands: Vec<CommandDef>,
}

impl PluginDescriptor {
    /// A bare plugin descriptor with the given name and no other content.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            dependencies: Vec::new(),
            config_schema: None,
            provider_handlers: HandlerTable::new(),
            module_types: Vec::new(),
            module_type_extensions: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Sets this plugin's `base` parent.
    #[must_use]
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Adds a declared dependency.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Adds a created module type.
    #[must_use]
    pub fn with_module_type(mut self, module_type: ModuleTypeDef) -> Self {
        self.module_types.push(module_type);
        self
    }

    /// Adds a module type extension.
    #[must_use]
    pub fn with_module_type_extension(mut self, extension: ModuleTypeExtension) -> Self {
        self.module_type_extensions.push(extension);
        self
    }
}
