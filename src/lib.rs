//! Core engine for a polyglot development orchestrator.
//!
//! This crate re-exports [`garden_core`], which wires together plugin
//! resolution, module configuration, the config graph, and the task graph
//! scheduler into a single owned [`Project`](garden_core::Project)
//! aggregate. Concrete plugins, the CLI surface, and the interactive
//! renderer live outside this crate.

pub use garden_core::*;

/// Re-export of the most commonly used types.
pub mod prelude {
    pub use garden_core::prelude::*;
}
