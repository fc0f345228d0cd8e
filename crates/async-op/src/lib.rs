//! Adapter for callback-style asynchronous operations.
//!
//! Many system APIs split an operation into a *start* call that takes a
//! completion callback and a *finish* call that turns the raw completion
//! handle into a result. [`AsyncAdapter`] wraps such a pair into a callable
//! returning an [`OperationFuture`] that resolves exactly once.
//!
//! Operations are never cancelled: the start function always receives `None`
//! for its cancellation token.

mod adapter;
mod merge;

pub use adapter::{AsyncAdapter, Completion, OperationFuture};
pub use merge::MergeDefaults;

/// Rejection of an [`OperationFuture`].
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AsyncOpError<E> {
    /// The finish function reported an error.
    #[error("operation failed: {0}")]
    Failed(E),

    /// The completion callback was dropped without being invoked.
    #[error("operation was abandoned before completing")]
    Abandoned,
}
