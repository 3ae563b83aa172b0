//! FIFO backlog of work items that have not started yet.
//!
//! The queue does no locking of its own; it lives inside the executor's
//! shared state mutex next to the delay gate, so append and take are short,
//! non-suspending critical sections.

use std::collections::VecDeque;

#[derive(Debug)]
pub(crate) struct WorkQueue<T> {
    items: VecDeque<T>,
}

impl<T> WorkQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append at the tail. Returns the queue length after the append.
    pub(crate) fn push(&mut self, item: T) -> usize {
        self.items.push_back(item);
        self.items.len()
    }

    /// Take from the head without waiting. `None` when nothing is queued.
    pub(crate) fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove everything, oldest first. Only used to resolve stranded items
    /// after a scheduling fault.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..)
    }
}
