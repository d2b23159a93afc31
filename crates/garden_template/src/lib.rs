//! Template string resolution for module and provider configuration.
//!
//! Configuration values may embed `${a.b.c}` references that are resolved
//! against a layered context built from project variables, provider outputs,
//! and (later, at runtime) dependency outputs. Resolution happens in two
//! passes, see [`Pass`].

mod error;
mod parser;
mod resolver;

pub use error::TemplateError;
pub use parser::{Placeholder, find_placeholders};
pub use resolver::{Pass, resolve_string, resolve_value};
