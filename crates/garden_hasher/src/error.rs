//! Errors raised while enumerating files or computing a module version.

use std::path::PathBuf;

/// Errors produced by [`crate::enumerate_files`] and [`crate::compute_version`].
#[derive(Debug, thiserror::Error)]
pub enum HasherError {
    /// An `include`/`exclude` pattern was not a valid glob.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        /// The offending pattern.
        pattern: String,
        /// Underlying glob-compilation error.
        #[source]
        source: globset::Error,
    },

    /// Walking the module root failed (permission error, broken symlink, etc).
    #[error("failed to walk '{path}': {source}")]
    Walk {
        /// The root that was being walked.
        path: PathBuf,
        /// Underlying walk error.
        #[source]
        source: ignore::Error,
    },

    /// Reading a candidate file's contents for hashing failed.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        /// The file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
