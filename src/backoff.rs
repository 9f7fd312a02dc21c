//! Retry policy for the slot-state spin loops.

use crate::sync::{spin_loop, yield_now};
use crate::trace::trace;

/// What a thread does while waiting for a peer to finish with a slot.
///
/// No policy ever parks the thread: the queue stays non-blocking, the knob
/// only trades CPU burn against wake-up latency under contention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Backoff {
    /// Busy-wait with a CPU spin hint on every retry.
    Spin,
    /// Spin `spin_limit` times, then yield the time slice on every further retry.
    SpinThenYield {
        /// Retries before falling back to `yield_now`.
        spin_limit: u32,
    },
}

impl Backoff {
    /// Spin budget used by [`Backoff::default`].
    pub const DEFAULT_SPIN_LIMIT: u32 = 64;

    #[inline]
    pub(crate) const fn spinner(self) -> Spinner {
        Spinner { policy: self, step: 0 }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::SpinThenYield {
            spin_limit: Self::DEFAULT_SPIN_LIMIT,
        }
    }
}

/// Per-wait retry counter.
pub(crate) struct Spinner {
    policy: Backoff,
    step: u32,
}

impl Spinner {
    #[inline]
    pub(crate) fn snooze(&mut self) {
        match self.policy {
            Backoff::Spin => spin_loop(),
            Backoff::SpinThenYield { spin_limit } => {
                if self.step < spin_limit {
                    self.step += 1;
                    spin_loop();
                } else {
                    if self.step == spin_limit {
                        self.step += 1;
                        trace!(spin_limit, "slot wait exceeded spin budget, yielding");
                    }
                    yield_now();
                }
            }
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn default_is_spin_then_yield() {
        assert_eq!(
            Backoff::default(),
            Backoff::SpinThenYield { spin_limit: 64 }
        );
    }

    #[test]
    fn spinner_escalates_past_limit() {
        let mut spinner = Backoff::SpinThenYield { spin_limit: 2 }.spinner();
        for _ in 0..5 {
            spinner.snooze();
        }
        assert_eq!(spinner.step, 3);
    }

    #[test]
    fn pure_spin_never_counts() {
        let mut spinner = Backoff::Spin.spinner();
        spinner.snooze();
        spinner.snooze();
        assert_eq!(spinner.step, 0);
    }
}
