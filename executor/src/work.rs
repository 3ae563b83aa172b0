//! Work items and the per-submission result plumbing.
//!
//! Each submission gets a oneshot channel. The sending half ([`Completion`])
//! travels with the queued item and is consumed by value when the dispatcher
//! resolves it, so a second resolution cannot be written. The receiving half
//! is the caller's [`TaskHandle`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tokio::sync::oneshot;

use pacer_types::TaskSeq;

use crate::error::TaskError;

/// A deferred unit of work: nothing runs until the dispatcher calls it.
pub(crate) type Operation<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;

pub(crate) type Outcome<T, E> = Result<T, TaskError<E>>;

pub(crate) struct WorkItem<T, E> {
    pub(crate) seq: TaskSeq,
    pub(crate) operation: Operation<T, E>,
    pub(crate) completion: Completion<T, E>,
}

impl<T, E> fmt::Debug for WorkItem<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// Write-once slot for one item's outcome.
pub(crate) struct Completion<T, E> {
    seq: TaskSeq,
    tx: oneshot::Sender<Outcome<T, E>>,
}

impl<T, E> Completion<T, E> {
    pub(crate) fn resolve(self, outcome: Outcome<T, E>) {
        if self.tx.send(outcome).is_err() {
            tracing::trace!(seq = %self.seq, "Result discarded; caller dropped its handle");
        }
    }
}

/// Future for one submitted operation's result.
///
/// Dropping the handle does not cancel the work; the operation still runs in
/// its turn and its result is discarded.
#[must_use = "the result of a submitted operation is only observable through its handle"]
pub struct TaskHandle<T, E> {
    seq: TaskSeq,
    rx: oneshot::Receiver<Outcome<T, E>>,
}

impl<T, E> TaskHandle<T, E> {
    /// Submission sequence number of the item behind this handle.
    #[must_use]
    pub fn seq(&self) -> TaskSeq {
        self.seq
    }
}

impl<T, E> fmt::Debug for TaskHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl<T, E> Future for TaskHandle<T, E> {
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sender dropped unresolved: only happens when the dispatcher died mid-item.
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Create the paired completion slot and caller handle for one submission.
pub(crate) fn channel<T, E>(seq: TaskSeq) -> (Completion<T, E>, TaskHandle<T, E>) {
    let (tx, rx) = oneshot::channel();
    (Completion { seq, tx }, TaskHandle { seq, rx })
}
