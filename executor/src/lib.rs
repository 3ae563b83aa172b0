//! Rate-limited sequential task executor.
//!
//! Accepts async operations from any number of producers and runs them one at
//! a time, in submission order, with a minimum spacing between dispatches.
//! Meant to sit in front of an external resource that enforces its own rate
//! limit (an HTTP API, a storage service).
//!
//! # Architecture
//!
//! ```text
//! submit() -> WorkQueue (FIFO) -> trigger -> drain cycle (one per executor)
//!                                              |
//!                                              v
//!                       wait gate -> pop -> run -> resolve handle -> arm gate
//! ```
//!
//! - [`queue`](crate::queue): FIFO backlog, non-blocking push/pop
//! - [`gate`](crate::gate): `Open | PendingUntil(instant)` delay gate
//! - [`dispatcher`](crate::dispatcher): the supervised drain loop and its token
//! - [`DelayedExecutor`]: the submission facade
//!
//! # Failure model
//!
//! An operation's error or panic is delivered only to its own
//! [`TaskHandle`]; the loop moves on to the next item. A failure of the loop
//! itself is a [`SchedulingFault`]: it is logged, recorded on the executor,
//! every queued item resolves with [`TaskError::Faulted`], and further
//! submissions are rejected. There is no automatic restart.
//!
//! # Limitations
//!
//! No cancellation or timeout: an operation that never completes stalls the
//! queue behind it. Dropping a [`TaskHandle`] discards the result but the
//! operation still runs.

mod dispatcher;
mod error;
mod executor;
mod gate;
mod queue;
mod work;


pub use error::{SchedulingFault, SubmitError, TaskError};
pub use executor::DelayedExecutor;
pub use work::TaskHandle;

pub use pacer_types::{DelayPolicy, ExecutorSettings, TaskSeq};
