//! The work a [`crate::TaskNode`] runs when dispatched.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::SchedulerError;

/// A boxed, owned future, the shape every `process` returns.
pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<Value, SchedulerError>> + Send>>;

/// A node's work.
///
/// Plugin handlers (`garden_plugin::Handler`) are synchronous; a `Process`
/// wraps one in an async boundary so the scheduler's own concurrency,
/// timeout, and cancellation machinery stays fully async regardless of what
/// an individual handler does internally (it may itself perform blocking
/// I/O, which implementations should move to a blocking thread pool).
pub trait Process: Send + Sync {
    /// Runs this node's work. `cancel` is cooperative: long-running
    /// implementations should poll it and return early when set.
    fn run(&self, cancel: CancellationToken) -> ProcessFuture;
}

impl<F> Process for F
where
    F: Fn(CancellationToken) -> ProcessFuture + Send + Sync,
{
    fn run(&self, cancel: CancellationToken) -> ProcessFuture {
        self(cancel)
    }
}
