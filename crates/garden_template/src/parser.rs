//! Lexical scanning for `${a.b.c}` placeholders inside a string.

/// A single `${...}` placeholder found inside a source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The dotted path inside the braces, e.g. `["providers", "test-a", "outputs", "foo"]`.
    pub path: Vec<String>,
    /// Byte offset of the `$` in the source string.
    pub start: usize,
    /// Byte offset one past the closing `}`.
    pub end: usize,
}

impl Placeholder {
    /// Renders the placeholder's path back into its dotted form, e.g. `a.b.c`.
    #[must_use]
    pub fn expression(&self) -> String {
        self.path.join(".")
    }

    /// Returns true if this placeholder spans the entire source string, i.e.
    /// the field's value is nothing but the reference itself.
    #[must_use]
    pub fn spans_whole(&self, source_len: usize) -> bool {
        self.start == 0 && self.end == source_len
    }
}

/// Scans `source` for all `${...}` placeholders, in order of appearance.
///
/// Malformed placeholders (an unterminated `${` with no matching `}`) are
/// silently ignored, matching the tolerant behavior of the reference
/// implementation: a literal `${` with no closing brace is left as-is.
#[must_use]
pub fn find_placeholders(source: &str) -> Vec<Placeholder> {
    let bytes = source.as_bytes();
    let mut placeholders = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'{' {
            if let Some(close) = source[i + 2..].find('}') {
                let inner = &source[i + 2..i + 2 + close];
                let path: Vec<String> = inner
                    .split('.')
                    .map(|segment| segment.trim().to_string())
                    .collect();
                let end = i + 2 + close + 1;
                placeholders.push(Placeholder {
                    path,
                    start: i,
                    end,
                });
                i = end;
                continue;
            }
        }
        i += 1;
    }
    placeholders
}
