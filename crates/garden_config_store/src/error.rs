//! Errors raised by [`crate::ConfigStore`].

use std::path::PathBuf;

/// Errors produced while reading or writing the config store file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigStoreError {
    /// Reading the store file from disk failed (other than "doesn't exist yet").
    #[error("failed to read config store at '{path}': {source}")]
    Read {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file's contents were not valid JSON, or not a JSON object.
    #[error("config store at '{path}' is corrupt: {source}")]
    Corrupt {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the replacement file failed.
    #[error("failed to write config store at '{path}': {source}")]
    Write {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be deserialized into the requested type.
    #[error("value for key '{key}' does not match the requested type: {source}")]
    TypeMismatch {
        /// The key being read.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
