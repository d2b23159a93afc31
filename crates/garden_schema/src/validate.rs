//! Default application and validation against a [`Schema`].

use regex::Regex;
use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::{Kind, Schema, type_name};

/// Applies `schema`'s defaults to `value`, top-down, returning the result.
///
/// Missing object properties that carry a `default` are inserted; existing
/// properties recurse so nested defaults are applied too. Arrays apply their
/// `items` schema's defaults to every element already present.
#[must_use]
pub fn apply_defaults(schema: &Schema, value: &Value) -> Value {
    match &schema.kind {
        Kind::Object { properties, .. } => {
            let mut object = value.as_object().cloned().unwrap_or_default();
            for (name, prop_schema) in properties {
                match object.get(name) {
                    Some(existing) => {
                        let defaulted = apply_defaults(prop_schema, existing);
                        object.insert(name.clone(), defaulted);
                    }
                    None => {
                        if let Some(default) = &prop_schema.default {
                            object.insert(name.clone(), apply_defaults(prop_schema, default));
                        }
                    }
                }
            }
            Value::Object(object)
        }
        Kind::Array { items } => match value.as_array() {
            Some(array) => Value::Array(array.iter().map(|item| apply_defaults(items, item)).collect()),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Validates `value` against `schema`, collecting every failure found rather
/// than stopping at the first one.
pub fn validate(schema: &Schema, value: &Value) -> Result<(), Vec<SchemaError>> {
    let mut errors = Vec::new();
    validate_at("", schema, value, &mut errors);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Applies defaults from, then validates against, each schema in `schemas`
/// in order. Mirrors the module/provider configuration flow: a value is
/// checked against its own schema and then against each of its `base`
/// chain's schemas, and must satisfy all of them.
pub fn validate_all(schemas: &[&Schema], value: &Value) -> Result<Value, Vec<SchemaError>> {
    let mut current = value.clone();
    let mut errors = Vec::new();
    for schema in schemas {
        current = apply_defaults(schema, &current);
        validate_at("", schema, &current, &mut errors);
    }
    if errors.is_empty() { Ok(current) } else { Err(errors) }
}

fn validate_at(path: &str, schema: &Schema, value: &Value, errors: &mut Vec<SchemaError>) {
    match &schema.kind {
        Kind::Any => {}
        Kind::Object { properties, required } => {
            let Some(object) = value.as_object() else {
                errors.push(SchemaError::TypeMismatch {
                    path: path.to_string(),
                    expected: "object",
                    found: type_name(value),
                });
                return;
            };
            for name in required {
                if !object.contains_key(name) {
                    errors.push(SchemaError::MissingRequired { path: format!("{path}/{name}") });
                }
            }
            for (name, prop_schema) in properties {
                if let Some(prop_value) = object.get(name) {
                    validate_at(&format!("{path}/{name}"), prop_schema, prop_value, errors);
                }
            }
        }
        Kind::Array { items } => {
            let Some(array) = value.as_array() else {
                errors.push(SchemaError::TypeMismatch {
                    path: path.to_string(),
                    expected: "array",
                    found: type_name(value),
                });
                return;
            };
            for (index, item) in array.iter().enumerate() {
                validate_at(&format!("{path}/{index}"), items, item, errors);
            }
        }
        Kind::String => {
            let Some(s) = value.as_str() else {
                errors.push(SchemaError::TypeMismatch {
                    path: path.to_string(),
                    expected: "string",
                    found: type_name(value),
                });
                return;
            };
            if let Some(pattern) = &schema.pattern {
                match Regex::new(&format!("^(?:{pattern})$")) {
                    Ok(re) if re.is_match(s) => {}
                    _ => errors.push(SchemaError::PatternMismatch {
                        path: path.to_string(),
                        pattern: pattern.clone(),
                    }),
                }
            }
            check_allowed(path, schema, value, errors);
        }
        Kind::Number => {
            if !value.is_number() {
                errors.push(SchemaError::TypeMismatch {
                    path: path.to_string(),
                    expected: "number",
                    found: type_name(value),
                });
                return;
            }
            check_allowed(path, schema, value, errors);
        }
        Kind::Boolean => {
            if !value.is_boolean() {
                errors.push(SchemaError::TypeMismatch {
                    path: path.to_string(),
                    expected: "boolean",
                    found: type_name(value),
                });
                return;
            }
            check_allowed(path, schema, value, errors);
        }
    }
}

fn check_allowed(path: &str, schema: &Schema, value: &Value, errors: &mut Vec<SchemaError>) {
    if let Some(allowed) = &schema.allowed
        && !allowed.contains(value)
    {
        errors.push(SchemaError::NotAllowed { path: path.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn port_schema() -> Schema {
        let mut properties = BTreeMap::new();
        properties.insert("port".to_string(), Schema::number().with_default(json!(8080)));
        properties.insert(
            "name".to_string(),
            Schema::string().with_pattern("[a-z][a-z0-9-]*"),
        );
        Schema::object(properties, vec!["name".to_string()])
    }

    #[test]
    fn applies_default_for_missing_property() {
        let schema = port_schema();
        let value = json!({ "name": "web" });
        let defaulted = apply_defaults(&schema, &value);
        assert_eq!(defaulted, json!({ "name": "web", "port": 8080 }));
    }

    #[test]
    fn validates_successfully_after_defaults() {
        let schema = port_schema();
        let value = apply_defaults(&schema, &json!({ "name": "web" }));
        assert!(validate(&schema, &value).is_ok());
    }

    #[test]
    fn reports_missing_required_field() {
        let schema = port_schema();
        let err = validate(&schema, &json!({ "port": 80 })).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].path(), "/name");
    }

    #[test]
    fn reports_pattern_mismatch_with_path() {
        let schema = port_schema();
        let err = validate(&schema, &json!({ "name": "Bad_Name" })).unwrap_err();
        assert!(err.iter().any(|e| matches!(e, SchemaError::PatternMismatch { path, .. } if path == "/name")));
    }

    #[test]
    fn validate_all_checks_base_chain_schemas() {
        let mut base_properties = BTreeMap::new();
        base_properties.insert(
            "apiVersion".to_string(),
            Schema::string().with_default(json!("v1")),
        );
        let base = Schema::object(base_properties, vec!["apiVersion".to_string()]);
        let concrete = port_schema();

        let result = validate_all(&[&concrete, &base], &json!({ "name": "web" })).unwrap();
        assert_eq!(result, json!({ "name": "web", "port": 8080, "apiVersion": "v1" }));
    }

    #[test]
    fn validate_all_surfaces_every_schema_error() {
        let mut base_properties = BTreeMap::new();
        base_properties.insert("apiVersion".to_string(), Schema::string());
        let base = Schema::object(base_properties, vec!["apiVersion".to_string()]);
        let concrete = port_schema();

        let errors = validate_all(&[&concrete, &base], &json!({})).unwrap_err();
        assert!(errors.iter().any(|e| e.path() == "/name"));
        assert!(errors.iter().any(|e| e.path() == "/apiVersion"));
    }
}
