//! Delay gate: the earliest instant the next dispatch may start.
//!
//! An explicit two-state cell instead of a chain of one-shot signals. It sits
//! in the same mutex as the queue and only the dispatcher (serialized by the
//! dispatch token) ever arms it, so there is no concurrent re-arming.
//!
//! Time comes from `tokio::time::Instant`, which follows the runtime clock and
//! can be paused in tests.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Upper bound for a single arm, so absurd delays cannot overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum DelayGate {
    /// The next dispatch may proceed immediately.
    #[default]
    Open,
    /// The next dispatch must not start before this instant.
    PendingUntil(Instant),
}

impl DelayGate {
    /// Close the gate and schedule it to reopen `delay` from now.
    pub(crate) fn arm(&mut self, delay: Duration) {
        self.arm_from(Instant::now(), delay);
    }

    /// Close the gate until `delay` after `from`. A zero delay leaves it open.
    pub(crate) fn arm_from(&mut self, from: Instant, delay: Duration) {
        if delay.is_zero() {
            *self = Self::Open;
            return;
        }
        *self = Self::PendingUntil(from + delay.min(FAR_FUTURE));
    }

    /// What the dispatcher still has to wait for, relative to `now`.
    ///
    /// `None` once the gate is open or its deadline has passed.
    pub(crate) fn deadline(&self, now: Instant) -> Option<Instant> {
        match *self {
            Self::Open => None,
            Self::PendingUntil(until) if until <= now => None,
            Self::PendingUntil(until) => Some(until),
        }
    }
}

/// Suspend the dispatcher until the gate opens.
///
/// No timeout and no cancellation: a pending deadline is always honored.
pub(crate) async fn wait_open(deadline: Option<Instant>) {
    if let Some(until) = deadline {
        sleep_until(until).await;
    }
}
