//! The runtime template pass wrapping every handler invocation.

use garden_template::{Pass, find_placeholders, resolve_value};
use serde_json::Value;

use crate::error::ActionError;
use crate::target::ActionTarget;

/// Resolves every `${...}` placeholder in `params` against `context` using
/// [`Pass::Runtime`].
///
/// On failure, re-walks `params` to collect every `${runtime.*}` expression
/// that does not resolve against `context`, so the caller can report all of
/// them at once rather than just the first the resolver happened to hit.
pub fn resolve_runtime_params(params: &Value, context: &Value, target: &ActionTarget) -> Result<Value, ActionError> {
    match resolve_value(params, context, Pass::Runtime) {
        Ok(resolved) => Ok(resolved),
        Err(_source) => {
            let mut expressions = collect_unresolved_runtime_expressions(params, context);
            expressions.sort();
            expressions.dedup();
            let (target_kind, target_name) = target.describe();
            Err(ActionError::UnresolvedRuntimeReference { target_kind, target_name, expressions })
        }
    }
}

fn collect_unresolved_runtime_expressions(value: &Value, context: &Value) -> Vec<String> {
    let mut strings = Vec::new();
    collect_strings(value, &mut strings);

    let mut unresolved = Vec::new();
    for s in &strings {
        for placeholder in find_placeholders(s) {
            if placeholder.path.first().map(String::as_str) == Some("runtime") && lookup_path(context, &placeholder.path).is_none() {
                unresolved.push(s[placeholder.start..placeholder.end].to_string());
            }
        }
    }
    unresolved
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

fn lookup_path<'a>(context: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = context;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn reports_every_unresolved_runtime_expression() {
        let params = json!({
            "a": "${runtime.services.service-b.outputs.foo}",
            "b": "${runtime.tasks.job.outputs.bar}",
        });
        let context = json!({ "runtime": { "services": {}, "tasks": {} } });
        let target = ActionTarget::Service("service-a".to_string());

        let err = resolve_runtime_params(&params, &context, &target).unwrap_err();
        match err {
            ActionError::UnresolvedRuntimeReference { target_kind, target_name, expressions } => {
                assert_eq!(target_kind, "service");
                assert_eq!(target_name, "service-a");
                assert_eq!(
                    expressions,
                    vec![
                        "${runtime.services.service-b.outputs.foo}".to_string(),
                        "${runtime.tasks.job.outputs.bar}".to_string(),
                    ]
                );
            }
            other => panic!("expected UnresolvedRuntimeReference, got {other:?}"),
        }
    }

    #[test]
    fn error_message_names_the_entity_and_expression() {
        let params = json!({ "url": "${runtime.services.service-b.outputs.foo}" });
        let context = json!({ "runtime": { "services": {}, "tasks": {} } });
        let target = ActionTarget::Service("service-a".to_string());

        let err = resolve_runtime_params(&params, &context, &target).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to resolve one or more runtime template values for service 'service-a': ${runtime.services.service-b.outputs.foo}"
        );
    }

    #[test]
    fn resolves_when_context_provides_every_reference() {
        let params = json!({ "url": "${runtime.services.service-b.outputs.foo}" });
        let context = json!({ "runtime": { "services": { "service-b": { "outputs": { "foo": "http://host" } } }, "tasks": {} } });
        let target = ActionTarget::Service("service-a".to_string());

        let resolved = resolve_runtime_params(&params, &context, &target).unwrap();
        assert_eq!(resolved["url"], json!("http://host"));
    }
}
