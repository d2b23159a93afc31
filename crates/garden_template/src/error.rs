//! Errors raised while resolving template strings.

/// Errors produced by [`crate::resolve_value`] and [`crate::resolve_string`].
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A reference re-entered itself while being resolved.
    ///
    /// `trail` lists the chain of references that led back to `path`, in the
    /// order they were entered (most recent last).
    #[error("circular reference detected: {}", format_cycle(path, trail))]
    CircularReference {
        /// The reference expression that closed the cycle.
        path: String,
        /// The chain of references entered before the cycle closed.
        trail: Vec<String>,
    },

    /// A reference could not be resolved against the supplied context.
    #[error("unable to resolve template reference '${{{expression}}}' (resolution trail: {})", trail.join(" -> "))]
    UnresolvedReference {
        /// The raw `a.b.c` expression that failed to resolve.
        expression: String,
        /// The chain of references that led to this one.
        trail: Vec<String>,
    },

    /// A reference resolved to a non-string value in a position that requires
    /// a string (i.e. the placeholder is embedded inside a larger string
    /// rather than being the entire value of the field).
    #[error(
        "template reference '${{{expression}}}' resolved to a non-string value ({found}) but is not the entire field value"
    )]
    TypeMismatch {
        /// The raw `a.b.c` expression.
        expression: String,
        /// A human-readable description of the value's actual type.
        found: &'static str,
    },
}

fn format_cycle(path: &str, trail: &[String]) -> String {
    let mut chain: Vec<&str> = trail.iter().map(String::as_str).collect();
    chain.push(path);
    chain.reverse();
    chain.join(" <- ")
}
