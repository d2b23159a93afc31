//! Declarative schema validation for plugin-supplied configuration schemas.
//!
//! A [`Schema`] describes an object/array/string/number/boolean shape with
//! optional defaults, an `allowed` value set, a string `pattern`, and nested
//! child schemas. [`apply_defaults`] fills in missing fields top-down;
//! [`validate`] and [`validate_all`] then check the result, reporting every
//! failure with a JSON-Pointer-style path rather than stopping at the first.

mod error;
mod schema;
mod validate;

pub use error::SchemaError;
pub use schema::{Kind, Schema};
pub use validate::{apply_defaults, validate, validate_all};
