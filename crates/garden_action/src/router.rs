//! Handler selection and dispatch.

use garden_graph::{ConfigGraph, EntityRef};
use garden_plugin::{Handler, ResolvedRegistry};
use garden_runtime::RuntimeContext;
use serde_json::Value;
use tracing::debug;

use crate::error::ActionError;
use crate::runtime_pass::resolve_runtime_params;
use crate::target::ActionTarget;

/// Selects a handler for `(action_type, target)`, runs the runtime template
/// pass over `params`, and invokes it.
///
/// Handler selection:
/// 1. Module-typed targets (module, service, task, test) look up the owning
///    module's type. [`garden_plugin::ResolvedModuleType::handlers`] already
///    has every extending plugin overlaid on the creator's own (leaf wins);
///    if still unmatched, fall through to the creator plugin's own
///    `base`-chain-flattened [`garden_plugin::ResolvedPlugin::provider_handlers`].
/// 2. Provider-typed targets use that provider's plugin's
///    `provider_handlers` directly.
/// 3. If nothing matches and `default_handler` is given, it is used;
///    otherwise the call fails with [`ActionError::NoHandler`].
pub fn dispatch(
    action_type: &str,
    target: &ActionTarget,
    params: &Value,
    graph: &ConfigGraph,
    registry: &ResolvedRegistry,
    runtime: &RuntimeContext,
    default_handler: Option<&Handler>,
) -> Result<Value, ActionError> {
    let handler = resolve_handler(action_type, target, graph, registry, default_handler)?;
    let resolved_params = resolve_runtime_params(params, &runtime.template_context(), target)?;
    let (target_kind, target_name) = target.describe();
    debug!(action_type, target_kind, target_name, "dispatching action");
    handler.call(&resolved_params).map_err(ActionError::from)
}

fn resolve_handler(
    action_type: &str,
    target: &ActionTarget,
    graph: &ConfigGraph,
    registry: &ResolvedRegistry,
    default_handler: Option<&Handler>,
) -> Result<Handler, ActionError> {
    let found = match target {
        ActionTarget::Provider(name) => registry
            .plugins
            .iter()
            .find(|plugin| &plugin.name == name)
            .and_then(|plugin| plugin.provider_handlers.get(action_type))
            .map(|entry| entry.handler.clone()),
        _ => {
            let module_name = owning_module_name(target, graph)?;
            let module = graph.module(&module_name).ok_or_else(|| unknown_target(target))?;
            let module_type = registry.module_types.get(&module.module_type).ok_or_else(|| unknown_target(target))?;

            module_type.handlers.get(action_type).map(|entry| entry.handler.clone()).or_else(|| {
                registry
                    .plugins
                    .iter()
                    .find(|plugin| plugin.name == module_type.creator)
                    .and_then(|plugin| plugin.provider_handlers.get(action_type))
                    .map(|entry| entry.handler.clone())
            })
        }
    };

    found.or_else(|| default_handler.cloned()).ok_or_else(|| {
        let (target_kind, target_name) = target.describe();
        ActionError::NoHandler { action_type: action_type.to_string(), target_kind, target_name }
    })
}

fn owning_module_name(target: &ActionTarget, graph: &ConfigGraph) -> Result<String, ActionError> {
    match target {
        ActionTarget::Module(name) => graph.module(name).map(|m| m.name.clone()).ok_or_else(|| unknown_target(target)),
        ActionTarget::Service(name) => {
            graph.owning_module(&EntityRef::service(name.clone())).map(str::to_string).ok_or_else(|| unknown_target(target))
        }
        ActionTarget::Task(name) => {
            graph.owning_module(&EntityRef::task(name.clone())).map(str::to_string).ok_or_else(|| unknown_target(target))
        }
        ActionTarget::Test { module, name } => {
            graph.test(module, name).map(|_| module.clone()).ok_or_else(|| unknown_target(target))
        }
        ActionTarget::Provider(_) => unreachable!("providers are handled before owning_module_name is called"),
    }
}

fn unknown_target(target: &ActionTarget) -> ActionError {
    let (target_kind, target_name) = target.describe();
    ActionError::UnknownTarget { target_kind, target_name }
}
