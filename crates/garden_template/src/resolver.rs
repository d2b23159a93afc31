//! Resolution of `${a.b.c}` references against a layered context tree.

use serde_json::Value;

use crate::error::TemplateError;
use crate::parser::{Placeholder, find_placeholders};

/// Which resolution pass is being performed.
///
/// The static pass runs during config load, before any runtime dependency
/// output is known; `runtime.*` references are left verbatim rather than
/// failing. The runtime pass runs just before a handler invocation, once
/// dependency outputs are available, and requires every reference (including
/// `runtime.*`) to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Project variables, provider outputs; `runtime.*` is deferred.
    Static,
    /// Dependency outputs; every reference must resolve.
    Runtime,
}

/// Resolves every `${...}` placeholder found anywhere inside `value`
/// (recursing into objects and arrays) against `context`.
///
/// Returns a new [`Value`] tree with all resolvable placeholders substituted.
/// Errors accumulate the full resolution trail so messages can show callers
/// exactly which reference failed and why.
pub fn resolve_value(value: &Value, context: &Value, pass: Pass) -> Result<Value, TemplateError> {
    let mut resolving = Vec::new();
    resolve_value_inner(value, context, pass, &mut resolving)
}

/// Resolves a single template string (convenience wrapper around
/// [`resolve_value`] for string-valued fields).
pub fn resolve_string(source: &str, context: &Value, pass: Pass) -> Result<Value, TemplateError> {
    let mut resolving = Vec::new();
    resolve_string_inner(source, context, pass, &mut resolving)
}

fn resolve_value_inner(
    value: &Value,
    context: &Value,
    pass: Pass,
    resolving: &mut Vec<String>,
) -> Result<Value, TemplateError> {
    match value {
        Value::String(s) => resolve_string_inner(s, context, pass, resolving),
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_value_inner(item, context, pass, resolving)?);
            }
            Ok(Value::Array(resolved))
        }
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                resolved.insert(key.clone(), resolve_value_inner(val, context, pass, resolving)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string_inner(
    source: &str,
    context: &Value,
    pass: Pass,
    resolving: &mut Vec<String>,
) -> Result<Value, TemplateError> {
    let placeholders = find_placeholders(source);
    if placeholders.is_empty() {
        return Ok(Value::String(source.to_string()));
    }

    // A single placeholder spanning the whole string may resolve to any
    // JSON type; embedded placeholders must resolve to stringifiable scalars.
    if placeholders.len() == 1 && placeholders[0].spans_whole(source.len()) {
        let placeholder = &placeholders[0];
        if pass == Pass::Static && placeholder.path.first().map(String::as_str) == Some("runtime") {
            return Ok(Value::String(source.to_string()));
        }
        return resolve_placeholder(placeholder, context, pass, resolving);
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for placeholder in &placeholders {
        out.push_str(&source[cursor..placeholder.start]);
        let resolved = resolve_placeholder(placeholder, context, pass, resolving)?;
        match resolved {
            Value::String(s) => out.push_str(&s),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(&b.to_string()),
            // Deferred runtime.* references during the static pass: keep
            // the placeholder text verbatim so a later runtime pass can see it.
            Value::Null if pass == Pass::Static && placeholder.path.first().map(String::as_str) == Some("runtime") => {
                out.push_str(&source[placeholder.start..placeholder.end]);
            }
            other => {
                return Err(TemplateError::TypeMismatch {
                    expression: placeholder.expression(),
                    found: type_name(&other),
                });
            }
        }
        cursor = placeholder.end;
    }
    out.push_str(&source[cursor..]);
    Ok(Value::String(out))
}

fn resolve_placeholder(
    placeholder: &Placeholder,
    context: &Value,
    pass: Pass,
    resolving: &mut Vec<String>,
) -> Result<Value, TemplateError> {
    let expression = placeholder.expression();

    if pass == Pass::Static && placeholder.path.first().map(String::as_str) == Some("runtime") {
        // Deferred: represented as Null so the embedded-string case above can
        // detect it and re-emit the literal placeholder text. The whole-value
        // case is handled by the caller before reaching here.
        return Ok(Value::Null);
    }

    if resolving.iter().any(|seen| seen == &expression) {
        return Err(TemplateError::CircularReference {
            path: expression,
            trail: resolving.clone(),
        });
    }

    let found = lookup_path(context, &placeholder.path).ok_or_else(|| TemplateError::UnresolvedReference {
        expression: expression.clone(),
        trail: resolving.clone(),
    })?;

    // Context values may themselves be template strings (e.g. one provider's
    // config referencing another's output); resolve transitively, threading
    // the same `resolving` set so cycles anywhere in the chain are caught.
    resolving.push(expression);
    let result = resolve_value_inner(found, context, pass, resolving);
    resolving.pop();
    result
}

fn lookup_path<'a>(context: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = context;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_whole_value_placeholder_to_non_string() {
        let ctx = json!({ "modules": { "a": { "version": "v-abc123" } } });
        let resolved = resolve_string("${modules.a.version}", &ctx, Pass::Runtime).unwrap();
        assert_eq!(resolved, json!("v-abc123"));
    }

    #[test]
    fn resolves_embedded_placeholder_into_string() {
        let ctx = json!({ "environment": { "name": "local" } });
        let resolved = resolve_string("env-${environment.name}", &ctx, Pass::Runtime).unwrap();
        assert_eq!(resolved, json!("env-local"));
    }

    #[test]
    fn unresolved_reference_fails_outside_static_pass() {
        let ctx = json!({});
        let err = resolve_string("${providers.missing.outputs.foo}", &ctx, Pass::Runtime).unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { .. }));
    }

    #[test]
    fn runtime_reference_deferred_during_static_pass() {
        let ctx = json!({});
        let resolved = resolve_string("${runtime.services.service-b.outputs.foo}", &ctx, Pass::Static).unwrap();
        assert_eq!(resolved, json!("${runtime.services.service-b.outputs.foo}"));

        let embedded = resolve_string("x-${runtime.services.service-b.outputs.foo}", &ctx, Pass::Static).unwrap();
        assert_eq!(embedded, json!("x-${runtime.services.service-b.outputs.foo}"));
    }

    #[test]
    fn circular_reference_detected() {
        let ctx = json!({
            "providers": {
                "test-a": { "outputs": { "foo": "${providers.test-b.outputs.foo}" } },
                "test-b": { "outputs": { "foo": "${providers.test-a.outputs.foo}" } },
            }
        });
        let err = resolve_string("${providers.test-a.outputs.foo}", &ctx, Pass::Static).unwrap_err();
        match err {
            TemplateError::CircularReference { path, trail } => {
                assert_eq!(path, "providers.test-b.outputs.foo");
                assert_eq!(trail, vec!["providers.test-a.outputs.foo".to_string()]);
            }
            other => panic!("expected CircularReference, got {other:?}"),
        }
    }

    #[test]
    fn resolves_nested_object_tree() {
        let ctx = json!({ "variables": { "x": "1" } });
        let value = json!({ "a": "${variables.x}", "b": ["${variables.x}", "plain"] });
        let resolved = resolve_value(&value, &ctx, Pass::Runtime).unwrap();
        assert_eq!(resolved, json!({ "a": "1", "b": ["1", "plain"] }));
    }
}
