//! Construction-time configuration.

use crate::backoff::Backoff;
use crate::error::CapacityError;
use crate::{DEFAULT_CAPACITY, MIN_CAPACITY};

/// Settings applied when a queue is built.
///
/// ```
/// use handoff_queue::{Backoff, LockFreeQueue, QueueConfig};
///
/// let config = QueueConfig::new()
///     .with_capacity(256)
///     .with_backoff(Backoff::Spin);
/// let queue = LockFreeQueue::<u32>::with_config(config).unwrap();
/// assert_eq!(queue.capacity(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueueConfig {
    /// Number of slots in the lock-free ring. A preallocation hint for the
    /// lock-based backend.
    pub capacity: usize,
    /// Retry policy for slot-state spin loops.
    pub backoff: Backoff,
}

impl QueueConfig {
    /// Default capacity and backoff.
    pub const fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            backoff: Backoff::SpinThenYield {
                spin_limit: Backoff::DEFAULT_SPIN_LIMIT,
            },
        }
    }

    /// Sets the slot count.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the spin-loop retry policy.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Checks the capacity against the ring's requirements.
    ///
    /// Besides the [`MIN_CAPACITY`] floor, the capacity must be a power of
    /// two so masked slot indices stay consistent when the counters wrap.
    pub const fn validate(&self) -> Result<(), CapacityError> {
        if self.capacity < MIN_CAPACITY {
            return Err(CapacityError::TooSmall {
                requested: self.capacity,
                minimum: MIN_CAPACITY,
            });
        }
        if !self.capacity.is_power_of_two() {
            return Err(CapacityError::NotPowerOfTwo {
                requested: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.backoff, Backoff::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn minimum_is_accepted() {
        assert!(QueueConfig::new().with_capacity(64).validate().is_ok());
    }

    #[test]
    fn rejects_below_floor() {
        assert_eq!(
            QueueConfig::new().with_capacity(32).validate(),
            Err(CapacityError::TooSmall {
                requested: 32,
                minimum: 64
            })
        );
        assert!(QueueConfig::new().with_capacity(0).validate().is_err());
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(
            QueueConfig::new().with_capacity(100).validate(),
            Err(CapacityError::NotPowerOfTwo { requested: 100 })
        );
    }
}
