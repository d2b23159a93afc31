//! Deterministic content-addressed versioning for modules, tests, and tasks.
//!
//! A module's version folds the contents of its in-scope source files with
//! the resolved versions of its build dependencies into a short, stable
//! hash. The hasher is pure and memoizable by `(module path, dependency
//! versions, file set)`.

mod error;
mod files;
mod version;

pub use error::HasherError;
pub use files::enumerate_files;
pub use version::{ModuleVersion, compute_version, extend_version};
