//! Active-environment resolution: picking the environment name and folding
//! its variable overlay over the project's own `variables`.

use garden_module::{EnvironmentDef, ProjectDocument};
use serde_json::Value;

/// Picks the active environment name: `requested` if given, otherwise the
/// project document's `defaultEnvironment`.
#[must_use]
pub fn resolve_environment_name<'a>(requested: Option<&'a str>, project: Option<&'a ProjectDocument>) -> Option<&'a str> {
    requested.or_else(|| project.map(|doc| doc.default_environment.as_str()))
}

/// Folds `environment_name`'s variable overlay (if the project declares one
/// under that name) over the project's own `variables`, top-level keys from
/// the overlay taking precedence.
#[must_use]
pub fn merge_variables(project: Option<&ProjectDocument>, environment_name: &str) -> Value {
    let Some(project) = project else {
        return Value::Null;
    };
    let base = project.variables.clone();
    let overlay = project
        .environments
        .iter()
        .find(|env: &&EnvironmentDef| env.name == environment_name)
        .map(|env| env.variables.clone())
        .unwrap_or(Value::Null);
    merge(base, overlay)
}

fn merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}
