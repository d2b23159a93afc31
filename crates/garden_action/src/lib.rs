//! Action routing and dispatch.
//!
//! An action call names `(actionType, target)`. The router selects a
//! handler by the target's kind, runs the runtime template pass over the
//! handler's params, and invokes it.

mod error;
mod router;
mod runtime_pass;
mod target;

pub use error::ActionError;
pub use router::dispatch;
pub use target::ActionTarget;
