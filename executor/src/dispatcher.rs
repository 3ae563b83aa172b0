//! The dispatch loop.
//!
//! One drain cycle per dispatch token: wait on the gate, take the head item,
//! run it, resolve its handle, re-arm the gate per policy, repeat until the
//! queue is empty. The cycle runs inside a supervisor that catches panics and
//! turns any internal failure into a [`SchedulingFault`] on the executor.
//!
//! # Token release
//!
//! The token is released while the state lock is held and the queue is seen
//! empty. A producer appends under the same lock and only then tries the
//! token, so either the running cycle sees the new item or the producer gets
//! the token and starts a new cycle. No item is left queued with no cycle.
//!
//! A cycle that dies keeps the token until its fault is recorded, so no new
//! cycle can start on an executor that is about to be declared dead.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use pacer_types::{ExecutorSettings, TaskSeq};

use crate::error::{SchedulingFault, TaskError, panic_payload_to_string};
use crate::gate::{DelayGate, wait_open};
use crate::queue::WorkQueue;
use crate::work::{Operation, Outcome, WorkItem};

/// Queue, gate, and fault record, all behind one mutex.
pub(crate) struct State<T, E> {
    pub(crate) queue: WorkQueue<WorkItem<T, E>>,
    pub(crate) gate: DelayGate,
    pub(crate) next_seq: TaskSeq,
    pub(crate) fault: Option<SchedulingFault>,
}

/// Everything one executor instance owns. Clones of the executor share it.
pub(crate) struct Shared<T, E> {
    pub(crate) settings: ExecutorSettings,
    pub(crate) state: Mutex<State<T, E>>,
    /// Dispatch token: a single permit, held for one whole drain cycle.
    pub(crate) token: Arc<Semaphore>,
    /// Makes the next drain cycle panic after its gate wait.
    #[cfg(test)]
    pub(crate) panic_next_dispatch: AtomicBool,
}

impl<T, E> Shared<T, E> {
    pub(crate) fn new(settings: ExecutorSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(State {
                queue: WorkQueue::new(),
                gate: DelayGate::default(),
                next_seq: TaskSeq::new(0),
                fault: None,
            }),
            token: Arc::new(Semaphore::new(1)),
            #[cfg(test)]
            panic_next_dispatch: AtomicBool::new(false),
        }
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, State<T, E>>, SchedulingFault> {
        self.state.lock().map_err(|_| SchedulingFault::StatePoisoned)
    }

    /// Lock even if poisoned. Only for fault bookkeeping and introspection.
    pub(crate) fn lock_unchecked(&self) -> MutexGuard<'_, State<T, E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn fault(&self) -> Option<SchedulingFault> {
        self.lock_unchecked().fault.clone()
    }

    /// Record a fatal fault and resolve every queued item with it.
    ///
    /// The first fault wins; later ones are logged but not recorded.
    pub(crate) fn fail(&self, fault: SchedulingFault) -> SchedulingFault {
        let (recorded, stranded) = {
            let mut state = self.lock_unchecked();
            let recorded = state.fault.get_or_insert_with(|| fault.clone()).clone();
            let stranded: Vec<_> = state.queue.drain().collect();
            (recorded, stranded)
        };

        tracing::error!(
            error = %fault,
            stranded = stranded.len(),
            "Executor faulted; failing all queued work"
        );

        for item in stranded {
            item.completion
                .resolve(Err(TaskError::Faulted(recorded.clone())));
        }
        recorded
    }
}

impl<T, E> Shared<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Start a drain cycle unless one is already running.
    pub(crate) fn trigger(self: &Arc<Self>, runtime: &Handle) {
        let Ok(permit) = Arc::clone(&self.token).try_acquire_owned() else {
            // A running cycle will pick the new item up.
            return;
        };
        let shared = Arc::clone(self);
        runtime.spawn(supervise(shared, permit));
    }
}

/// Run one drain cycle and surface anything that kills it.
async fn supervise<T, E>(shared: Arc<Shared<T, E>>, permit: OwnedSemaphorePermit)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let mut permit = Some(permit);
    let result = AssertUnwindSafe(drain(&shared, &mut permit))
        .catch_unwind()
        .await;

    let fault = match result {
        Ok(Ok(())) => return,
        Ok(Err(fault)) => fault,
        Err(payload) => SchedulingFault::Panicked(panic_payload_to_string(payload.as_ref())),
    };
    shared.fail(fault);
    drop(permit);
}

async fn drain<T, E>(
    shared: &Shared<T, E>,
    permit: &mut Option<OwnedSemaphorePermit>,
) -> Result<(), SchedulingFault>
where
    T: Send + 'static,
    E: Send + 'static,
{
    let delay = shared.settings.delay();
    let policy = shared.settings.policy();
    tracing::debug!(
        policy = %policy,
        delay_ms = delay.as_millis() as u64,
        "Dispatch cycle started"
    );

    loop {
        // Look for work before waiting so an empty queue does not sit out the delay.
        let deadline = {
            let state = shared.lock()?;
            if state.queue.is_empty() {
                permit.take();
                drop(state);
                tracing::debug!("Dispatch cycle idle");
                return Ok(());
            }
            state.gate.deadline(Instant::now())
        };

        wait_open(deadline).await;

        #[cfg(test)]
        if shared.panic_next_dispatch.swap(false, Ordering::SeqCst) {
            panic!("dispatch failure injected by test");
        }

        let item = {
            let mut state = shared.lock()?;
            let Some(item) = state.queue.pop() else {
                permit.take();
                drop(state);
                tracing::debug!("Dispatch cycle idle");
                return Ok(());
            };
            if policy.arms_before_run() {
                state.gate.arm(delay);
            }
            tracing::trace!(seq = %item.seq, queue_len = state.queue.len(), "Dispatching");
            item
        };

        let WorkItem {
            seq,
            operation,
            completion,
        } = item;

        let outcome = run_operation(operation).await;
        match &outcome {
            Ok(_) => tracing::trace!(seq = %seq, "Work item finished"),
            Err(TaskError::Panicked(msg)) => {
                tracing::warn!(seq = %seq, panic = %msg, "Work item panicked");
            }
            Err(_) => tracing::debug!(seq = %seq, "Work item failed"),
        }

        let armed = if policy.arms_before_run() {
            Ok(())
        } else {
            shared.lock().map(|mut state| state.gate.arm(delay))
        };

        // Resolve before propagating a lock fault so this item's outcome is never lost.
        completion.resolve(outcome);
        armed?;
    }
}

/// Run one operation, capturing both its error and any panic.
async fn run_operation<T, E>(operation: Operation<T, E>) -> Outcome<T, E> {
    let result = AssertUnwindSafe(async move { operation().await })
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TaskError::Operation(err)),
        Err(payload) => Err(TaskError::Panicked(panic_payload_to_string(
            payload.as_ref(),
        ))),
    }
}
