//! Declarative schema types.

use std::collections::BTreeMap;

use serde_json::Value;

/// A declarative schema node.
///
/// Schemas nest: an [`Kind::Object`] carries a property name -> schema map,
/// an [`Kind::Array`] carries a single schema its elements must satisfy.
#[derive(Debug, Clone)]
pub struct Schema {
    /// The JSON kind this node expects.
    pub kind: Kind,
    /// Value substituted in when the field is absent. Only meaningful for a
    /// schema that is itself a property of an [`Kind::Object`].
    pub default: Option<Value>,
    /// If set, the value must equal one of these after defaults are applied.
    pub allowed: Option<Vec<Value>>,
    /// If set (string schemas only), the value must match this regular
    /// expression in its entirety.
    pub pattern: Option<String>,
    /// Human-readable documentation surfaced to plugin authors and users.
    pub description: Option<String>,
}

/// The JSON shape a [`Schema`] node expects.
#[derive(Debug, Clone)]
pub enum Kind {
    /// A JSON object with a fixed set of known properties.
    Object {
        /// Schema for each known property, keyed by property name.
        properties: BTreeMap<String, Schema>,
        /// Property names that must be present once defaults are applied.
        required: Vec<String>,
    },
    /// A JSON array whose elements must all satisfy `items`.
    Array {
        /// Schema every element must satisfy.
        items: Box<Schema>,
    },
    /// A JSON string.
    String,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// Any JSON value; used for opaque or plugin-defined payloads.
    Any,
}

impl Schema {
    /// An object schema with the given properties and required list.
    #[must_use]
    pub fn object(properties: BTreeMap<String, Schema>, required: Vec<String>) -> Self {
        Self::new(Kind::Object { properties, required })
    }

    /// An array schema whose elements satisfy `items`.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self::new(Kind::Array { items: Box::new(items) })
    }

    /// A string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::new(Kind::String)
    }

    /// A number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::new(Kind::Number)
    }

    /// A boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(Kind::Boolean)
    }

    /// A schema that accepts any JSON value.
    #[must_use]
    pub fn any() -> Self {
        Self::new(Kind::Any)
    }

    fn new(kind: Kind) -> Self {
        Self {
            kind,
            default: None,
            allowed: None,
            pattern: None,
            description: None,
        }
    }

    /// Sets the default value substituted when a property is absent.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Restricts this schema's values to the given set.
    #[must_use]
    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Requires string values to match `pattern` in their entirety.
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Attaches documentation to this schema node.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
