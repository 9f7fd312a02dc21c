//! Error types.
//!
//! A full queue is not a fault: [`PushError`] only hands the value back so
//! the caller can retry later. [`CapacityError`] covers the construction-time
//! misconfigurations that the fallible constructors report.

use core::fmt;

use thiserror::Error;

/// Returned by `try_push` when the queue is full. Carries the rejected value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Recovers the value that was not enqueued.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PushError(..)")
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

impl<T> std::error::Error for PushError<T> {}

/// Invalid capacity passed to a fallible constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// Fewer slots than the ring supports.
    #[error("capacity {requested} is below the minimum of {minimum} slots")]
    TooSmall {
        /// Capacity that was asked for.
        requested: usize,
        /// Smallest accepted capacity.
        minimum: usize,
    },
    /// Slot indices are taken modulo the capacity of free-running counters,
    /// which only stays consistent across counter overflow for powers of two.
    #[error("capacity {requested} is not a power of two")]
    NotPowerOfTwo {
        /// Capacity that was asked for.
        requested: usize,
    },
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn push_error_returns_value() {
        let err = PushError(String::from("payload"));
        assert_eq!(err.to_string(), "queue is full");
        assert_eq!(err.into_inner(), "payload");
    }

    #[test]
    fn capacity_error_messages() {
        let small = CapacityError::TooSmall { requested: 8, minimum: 64 };
        assert_eq!(small.to_string(), "capacity 8 is below the minimum of 64 slots");

        let odd = CapacityError::NotPowerOfTwo { requested: 100 };
        assert_eq!(odd.to_string(), "capacity 100 is not a power of two");
    }
}
