//! Public submission API.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::runtime::Handle;

use pacer_types::{DelayPolicy, ExecutorSettings, TaskSeq};

use crate::dispatcher::Shared;
use crate::error::{SchedulingFault, SubmitError, TaskError};
use crate::work::{self, TaskHandle, WorkItem};

/// Runs submitted operations one at a time, spacing them by a fixed delay.
///
/// Producers call [`submit`](Self::submit) from anywhere inside a Tokio
/// runtime and get a [`TaskHandle`] back immediately. A single dispatch loop
/// per executor runs the operations in submission order and holds each start
/// back until the delay gate opens:
///
/// - [`DelayPolicy::StartToStart`]: starts are at least `delay` apart.
/// - [`DelayPolicy::FinishToStart`]: each start is at least `delay` after the
///   previous operation finished.
///
/// Clones share the same queue and dispatcher.
///
/// ```no_run
/// # async fn demo() {
/// use std::time::Duration;
/// use pacer_executor::{DelayedExecutor, DelayPolicy, ExecutorSettings};
///
/// let executor: DelayedExecutor<u32, String> = DelayedExecutor::new(
///     ExecutorSettings::new(Duration::from_millis(100), DelayPolicy::StartToStart),
/// );
/// let handle = executor.submit(|| async { Ok(42) }).expect("inside a runtime");
/// assert_eq!(handle.await.ok(), Some(42));
/// # }
/// ```
pub struct DelayedExecutor<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> DelayedExecutor<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    #[must_use]
    pub fn new(settings: ExecutorSettings) -> Self {
        tracing::debug!(
            policy = %settings.policy(),
            delay_ms = settings.delay().as_millis() as u64,
            "Executor created"
        );
        Self {
            shared: Arc::new(Shared::new(settings)),
        }
    }

    /// Queue an operation and return a handle to its eventual result.
    ///
    /// Never waits on execution, only on the brief queue append. The
    /// operation is not called until its turn; errors and panics it raises
    /// are delivered through the handle.
    pub fn submit<F, Fut>(&self, operation: F) -> Result<TaskHandle<T, E>, SubmitError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| SubmitError::NoRuntime)?;

        let handle = {
            let mut state = match self.shared.lock() {
                Ok(state) => state,
                Err(fault) => return Err(SubmitError::Faulted(self.shared.fail(fault))),
            };
            if let Some(fault) = &state.fault {
                return Err(SubmitError::Faulted(fault.clone()));
            }

            let seq = state.next_seq;
            state.next_seq = seq.next();
            let (completion, handle) = work::channel(seq);
            let queue_len = state.queue.push(WorkItem {
                seq,
                operation: Box::new(move || operation().boxed()),
                completion,
            });
            tracing::trace!(seq = %seq, queue_len, "Work item queued");
            handle
        };

        self.shared.trigger(&runtime);
        Ok(handle)
    }

    /// Submit and wait for the result in one step.
    ///
    /// Submission failures come back as [`TaskError::Rejected`].
    pub async fn execute<F, Fut>(&self, operation: F) -> Result<T, TaskError<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        self.submit(operation)?.await
    }
}

impl<T, E> DelayedExecutor<T, E> {
    #[must_use]
    pub fn settings(&self) -> ExecutorSettings {
        self.shared.settings
    }

    #[must_use]
    pub fn policy(&self) -> DelayPolicy {
        self.shared.settings.policy()
    }

    /// Items waiting to start. The in-flight item is not counted.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.shared.lock_unchecked().queue.len()
    }

    /// Whether a drain cycle currently holds the dispatch token.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.shared.token.available_permits() == 0
    }

    /// The fault that stopped this executor, if any.
    #[must_use]
    pub fn fault(&self) -> Option<SchedulingFault> {
        self.shared.fault()
    }

    /// Sequence number the next submission will get.
    #[must_use]
    pub fn next_seq(&self) -> TaskSeq {
        self.shared.lock_unchecked().next_seq
    }
}

impl<T, E> Clone for DelayedExecutor<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for DelayedExecutor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock_unchecked();
        f.debug_struct("DelayedExecutor")
            .field("settings", &self.shared.settings)
            .field("queue_len", &state.queue.len())
            .field("gate", &state.gate)
            .field("fault", &state.fault)
            .finish()
    }
}

#[cfg(test)]
impl<T, E> DelayedExecutor<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Poison the state lock the way a panicking lock holder would.
    pub(crate) fn poison_state(&self) {
        let shared = Arc::clone(&self.shared);
        let _ = std::thread::spawn(move || {
            let _guard = shared.state.lock();
            panic!("poisoning executor state for a test");
        })
        .join();
    }

    /// Make the next drain cycle panic outside any user operation.
    pub(crate) fn fail_next_dispatch(&self) {
        self.shared
            .panic_next_dispatch
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}
