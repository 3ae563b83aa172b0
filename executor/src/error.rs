//! Error taxonomy for the executor.
//!
//! - [`TaskError`]: what a single submission resolves to when it does not
//!   succeed. Operation failures stay local to the item that produced them.
//! - [`SubmitError`]: synchronous rejection at `submit` time.
//! - [`SchedulingFault`]: failure of the dispatch machinery itself. Fatal to
//!   the executor instance; every stranded item is resolved with it.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Unexpected failure inside the dispatcher or its shared state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingFault {
    /// The dispatch loop panicked outside of any user operation.
    #[error("dispatch loop panicked: {0}")]
    Panicked(String),
    /// A thread panicked while holding the queue/gate lock.
    #[error("executor state lock was poisoned")]
    StatePoisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// `submit` was called outside a Tokio runtime, so there is nowhere to
    /// host the dispatcher.
    #[error("no Tokio runtime is available to run the dispatcher")]
    NoRuntime,
    /// The executor hit a scheduling fault and accepts no further work.
    #[error("executor is no longer accepting work: {0}")]
    Faulted(#[source] SchedulingFault),
}

/// Failure outcome of one submitted work item.
#[derive(Debug)]
pub enum TaskError<E> {
    /// The operation ran and returned an error.
    Operation(E),
    /// The operation ran and panicked; carries the panic message.
    Panicked(String),
    /// The item was still queued when the executor faulted.
    Faulted(SchedulingFault),
    /// The item was in flight when the dispatcher died, so its result was lost.
    Abandoned,
    /// The item was never queued.
    Rejected(SubmitError),
}

impl<E> TaskError<E> {
    #[must_use]
    pub const fn is_operation(&self) -> bool {
        matches!(self, Self::Operation(_))
    }

    /// The operation's own error, if that is what this is.
    pub fn into_operation(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            _ => None,
        }
    }

    /// Map the operation error, leaving executor-side variants untouched.
    pub fn map_operation<F, E2>(self, f: F) -> TaskError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Operation(err) => TaskError::Operation(f(err)),
            Self::Panicked(msg) => TaskError::Panicked(msg),
            Self::Faulted(fault) => TaskError::Faulted(fault),
            Self::Abandoned => TaskError::Abandoned,
            Self::Rejected(err) => TaskError::Rejected(err),
        }
    }
}

impl<E> From<SubmitError> for TaskError<E> {
    fn from(err: SubmitError) -> Self {
        Self::Rejected(err)
    }
}

impl<E: fmt::Display> fmt::Display for TaskError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(err) => write!(f, "operation failed: {err}"),
            Self::Panicked(msg) => write!(f, "operation panicked: {msg}"),
            Self::Faulted(fault) => write!(f, "executor faulted before dispatch: {fault}"),
            Self::Abandoned => f.write_str("executor dropped the result of an in-flight operation"),
            Self::Rejected(err) => write!(f, "submission rejected: {err}"),
        }
    }
}

impl<E> StdError for TaskError<E>
where
    E: StdError + 'static,
{
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Faulted(fault) => Some(fault),
            Self::Rejected(err) => Some(err),
            Self::Panicked(_) | Self::Abandoned => None,
        }
    }
}

/// Render a `catch_unwind` payload as text.
pub(crate) fn panic_payload_to_string(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
