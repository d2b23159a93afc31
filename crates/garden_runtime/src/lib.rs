//! Runtime context construction.
//!
//! Given a target entity about to be dispatched and its already-computed
//! dependency results, builds the merged environment and the `runtime.*`
//! template context a handler invocation runs with.

mod context;

pub use context::{DependencyOutputs, RuntimeContext, ServiceRuntimeStatus, build_runtime_context};
