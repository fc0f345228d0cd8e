use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::AsyncOpError;
use crate::merge::MergeDefaults;

type StartFn<A, H> = dyn Fn(A, Option<CancellationToken>, Completion<H>);
type FinishFn<H, T, E> = dyn Fn(H) -> Result<T, E> + Send + Sync;

/// One-shot completion callback handed to an operation's start function.
///
/// Consumed by [`Completion::complete`], so an operation can report at most
/// one result. Dropping it unused rejects the future with
/// [`AsyncOpError::Abandoned`].
pub struct Completion<H> {
    callback: Box<dyn FnOnce(H) + Send>,
}

impl<H> Completion<H> {
    /// Delivers the raw completion handle.
    pub fn complete(self, handle: H) {
        (self.callback)(handle);
    }
}

impl<H> fmt::Debug for Completion<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Completion")
    }
}

/// Wraps a begin/finish operation pair plus fixed default arguments.
pub struct AsyncAdapter<A, H, T, E> {
    start: Rc<StartFn<A, H>>,
    finish: Arc<FinishFn<H, T, E>>,
    defaults: A,
}

impl<A, H, T, E> AsyncAdapter<A, H, T, E>
where
    A: MergeDefaults,
    H: 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(
        start: impl Fn(A, Option<CancellationToken>, Completion<H>) + 'static,
        finish: impl Fn(H) -> Result<T, E> + Send + Sync + 'static,
        defaults: A,
    ) -> Self {
        Self {
            start: Rc::new(start),
            finish: Arc::new(finish),
            defaults,
        }
    }

    /// Starts one operation.
    ///
    /// `args` are merged over the defaults (call values win). Every call gets
    /// its own future, resolved only by its own completion.
    pub fn call(&self, args: A) -> OperationFuture<T, E> {
        let (tx, rx) = oneshot::channel();
        let finish = Arc::clone(&self.finish);

        let completion = Completion {
            callback: Box::new(move |handle: H| {
                let result = finish(handle);
                if tx.send(result).is_err() {
                    trace!("operation result dropped: future no longer awaited");
                }
            }),
        };

        (self.start)(args.merge_over(&self.defaults), None, completion);
        OperationFuture { rx }
    }

    pub fn defaults(&self) -> &A {
        &self.defaults
    }
}

impl<A: Clone, H, T, E> Clone for AsyncAdapter<A, H, T, E> {
    fn clone(&self) -> Self {
        Self {
            start: Rc::clone(&self.start),
            finish: Arc::clone(&self.finish),
            defaults: self.defaults.clone(),
        }
    }
}

/// Future resolving to the finish function's result.
#[must_use = "futures do nothing unless awaited"]
#[derive(Debug)]
pub struct OperationFuture<T, E> {
    rx: oneshot::Receiver<Result<T, E>>,
}

impl<T, E> OperationFuture<T, E> {
    /// Returns the result if the operation has already completed.
    pub fn try_take(&mut self) -> Option<Result<T, AsyncOpError<E>>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result.map_err(AsyncOpError::Failed)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(AsyncOpError::Abandoned)),
        }
    }
}

impl<T, E> Future for OperationFuture<T, E> {
    type Output = Result<T, AsyncOpError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(result) => result.map_err(AsyncOpError::Failed),
            Err(_) => Err(AsyncOpError::Abandoned),
        })
    }
}
